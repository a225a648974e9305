//! Locates a handful of points with each locator kind and interpolates a
//! point field at them.

use volsample::*;

fn main() -> Result<()> {
    init_logging();

    let mesh = RectilinearMesh::new(
        vec![0.0, 0.5, 1.5, 3.0],
        vec![2.0, 1.0, 0.0],
        vec![0.0, 1.0, 2.0],
    )?;
    let field: Vec<f64> = (0..mesh.num_points())
        .map(|p| {
            let x = mesh.point(p);
            x.x + 10.0 * x.y + 100.0 * x.z
        })
        .collect();

    let kinds = [
        LocatorKind::Classic,
        LocatorKind::Bih,
        LocatorKind::Rect(RectCentering::Cell),
    ];
    let queries = [
        DVec3::new(0.25, 0.5, 0.5),
        DVec3::new(2.9, 1.9, 1.9),
        DVec3::new(1.5, 1.0, 1.0),
        DVec3::new(4.0, 0.0, 0.0),
    ];

    for kind in kinds {
        let locator = Locator::build_rectilinear(&mesh, &LocatorOptions::new(kind))?;
        println!("{kind:?}");
        for q in queries {
            match locator.find_cell(q, true) {
                Some(hit) => {
                    let ids = mesh.cell(hit.cell).point_ids().to_vec();
                    let values: Vec<f64> = ids.iter().map(|&p| field[p]).collect();
                    println!("  {q} -> cell {} (field {:.3})", hit.cell, hit.interpolate(&values));
                }
                None => println!("  {q} -> outside"),
            }
        }
    }
    Ok(())
}
