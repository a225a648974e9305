use super::Extractor;
use crate::camera_cell::{CellRef, PyramidCell};
use crate::tables::PYRAMID_AS_HEX;
use crate::volume::Volume;

impl Extractor {
    /// Samples a pyramid as a hexahedron whose top face collapses onto the apex.
    pub fn extract_pyramid(&self, cell: &PyramidCell, source: CellRef, volume: &mut Volume) -> usize {
        self.extract_hexahedron(&cell.as_hexahedron(&PYRAMID_AS_HEX), source, volume)
    }
}
