use super::Extractor;
use crate::camera_cell::{CellRef, TetrahedronCell};
use crate::tables::TET_AS_HEX;
use crate::volume::Volume;

impl Extractor {
    pub fn extract_tetrahedron(&self, cell: &TetrahedronCell, source: CellRef, volume: &mut Volume) -> usize {
        self.extract_hexahedron(&cell.as_hexahedron(&TET_AS_HEX), source, volume)
    }
}
