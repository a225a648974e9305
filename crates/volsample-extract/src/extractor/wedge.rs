use super::Extractor;
use crate::camera_cell::{CellRef, WedgeCell};
use crate::tables::WEDGE_AS_HEX;
use crate::volume::Volume;

impl Extractor {
    /// Samples a wedge as a hexahedron with one collapsed edge per triangle face.
    pub fn extract_wedge(&self, cell: &WedgeCell, source: CellRef, volume: &mut Volume) -> usize {
        self.extract_hexahedron(&cell.as_hexahedron(&WEDGE_AS_HEX), source, volume)
    }
}
