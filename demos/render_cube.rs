//! Renders a rectilinear cube holding a radial density field.
//!
//! The image is printed as ASCII art, one character per pixel, by alpha.
//! Run with `RUST_LOG=debug` to see the pass statistics.

use volsample::*;

fn main() -> Result<()> {
    init_logging();

    // Graded coordinates, denser towards the middle
    let n = 24;
    let line: Vec<f64> = (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64 * 2.0 - 1.0;
            t * t.abs().sqrt()
        })
        .collect();
    let mut mesh = RectilinearMesh::new(line.clone(), line.clone(), line.clone())?;

    let [cx, cy, cz] = mesh.cell_dims();
    let mut density = Vec::with_capacity(cx * cy * cz);
    for id in 0..mesh.num_cells() {
        let [i, j, k] = mesh.cell_ijk(id);
        let center = DVec3::new(
            0.5 * (line[i] + line[i + 1]),
            0.5 * (line[j] + line[j + 1]),
            0.5 * (line[k] + line[k + 1]),
        );
        density.push((1.0 - center.length()).max(0.0));
    }
    mesh.add_variable(Variable::scalar("density", Centering::Cell, density))?;

    let view = ViewTransform::perspective(
        DVec3::new(2.5, 1.5, 3.0),
        DVec3::ZERO,
        DVec3::Y,
        45f64.to_radians(),
        1.0,
        1.0,
        8.0,
    );
    let options = RenderOptions::default()
        .with_resolution(UVec3::new(48, 32, 64))
        .with_variable("density")
        .with_opacity_map(OpacityMap::viridis_ramp(0.0, 1.0))
        .with_parallel_slabs(4);

    let ray = RayFunction::default().with_background(Vec4::new(0.0, 0.0, 0.0, 1.0));
    let (image, stats) = render(&mesh, view, &options, &ray)?;

    println!(
        "{} cells, {} culled, {} samples written",
        stats.cells_visited, stats.culled, stats.samples_written
    );
    let shades = [' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
    for y in (0..image.height()).rev() {
        let row: String = (0..image.width())
            .map(|x| {
                let p = image.pixel(x, y);
                let lum = (p.x + p.y + p.z) / 3.0;
                shades[((lum * 9.0).round() as usize).min(9)]
            })
            .collect();
        println!("{row}");
    }
    Ok(())
}
