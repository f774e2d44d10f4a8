//! End-to-end conversion scenarios: point files in, DEM raster out.

use approx::assert_abs_diff_eq;
use lidem_algorithms::conversion::{rasterize, rasterize_with_report, ConversionParams};
use lidem_algorithms::interpolation::{fill_raster, NaturalNeighborInterpolator};
use lidem_algorithms::pointcloud::PointCloudDataSource;
use lidem_core::geo::{
    parse_rectangle_coordinates, GeoCoordinate, PixelCenterCoordinate, RasterArea, RasterDims,
};
use lidem_core::io::{create_and_write, read_geotiff, Driver, GeoTiffOptions};
use lidem_core::{Raster, ReferenceSystem};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Corners of a 10 x 10 square at 0 plus its centre at 10
const SQUARE: [(f64, f64, f64); 5] = [
    (0.0, 0.0, 0.0),
    (10.0, 0.0, 0.0),
    (10.0, 10.0, 0.0),
    (0.0, 10.0, 0.0),
    (5.0, 5.0, 10.0),
];

fn write_xyz(dir: &Path, name: &str, points: &[(f64, f64, f64, u8)]) -> PathBuf {
    let mut content = String::from("# x y z class\n");
    for (x, y, z, c) in points {
        writeln!(content, "{} {} {} {}", x, y, z, c).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn params(window: &str, resolution: f64, buffer: f64) -> ConversionParams {
    ConversionParams {
        calc_window: parse_rectangle_coordinates(window, ReferenceSystem::new("EPSG:25832"))
            .unwrap(),
        include_points_buffer: buffer,
        resolution,
        classes: vec![2],
        ..Default::default()
    }
}

#[test]
fn five_point_square_on_three_by_three_grid() {
    let mut nn = NaturalNeighborInterpolator::new();
    for (x, y, z) in SQUARE {
        nn.insert_point(GeoCoordinate::new(x, y), z).unwrap();
    }
    let area = RasterArea::from_center(
        PixelCenterCoordinate::new(0.0, 10.0),
        RasterDims::new(3, 3),
        5.0,
        ReferenceSystem::new("EPSG:25832"),
    )
    .unwrap();
    let mut dem: Raster<f32> = Raster::new("DEM", area).with_nodata(9999.0);
    dem.format().unwrap();

    let report = fill_raster(&nn, &mut dem).unwrap();
    assert_eq!(report.empty, 0);
    assert_eq!(dem.statistics().nodata_count, 0);

    assert_abs_diff_eq!(dem.get(1, 1).unwrap(), 10.0, epsilon = 1e-4);
    for (row, col) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
        assert_abs_diff_eq!(dem.get(row, col).unwrap(), 0.0, epsilon = 1e-4);
    }
}

#[test]
fn xyz_files_to_geotiff() {
    let dir = tempdir().unwrap();
    let points: Vec<_> = SQUARE.iter().map(|&(x, y, z)| (x, y, z, 2u8)).collect();
    write_xyz(dir.path(), "square.xyz", &points);
    // class 7 (noise) far above the surface must be ignored
    write_xyz(dir.path(), "noise.xyz", &[(2.0, 2.0, 500.0, 7)]);

    let mut source = PointCloudDataSource::from_descriptor(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(source.files().len(), 2);

    let (dem, report) =
        rasterize_with_report::<f32>(&params("-2.5,12.5,15,15", 5.0, 0.0), &mut source).unwrap();
    assert_eq!(report.files_read, 2);
    assert_eq!(report.points_read, 6);
    assert_eq!(report.points_kept, 5);
    assert_eq!(report.tin_points, 5);
    assert_eq!((report.cells_filled, report.cells_empty), (9, 0));
    assert_eq!(dem.shape(), (3, 3));
    assert_eq!(dem.get(1, 1).unwrap(), 10.0);
    assert_eq!(dem.get(0, 1).unwrap(), 0.0);

    let out = dir.path().join("dem.tif");
    create_and_write(&dem, &out, Driver::GTiff, &GeoTiffOptions::default()).unwrap();

    let back: Raster<f32> = read_geotiff(&out).unwrap();
    assert_eq!(back.shape(), (3, 3));
    assert_eq!(back.nodata(), Some(9999.0));
    assert_eq!(back.data(), dem.data());
    assert_eq!(back.transform(), dem.transform());
    assert_eq!(back.area().crs().epsg(), Some(25832));
}

#[test]
fn buffer_brings_in_points_outside_the_window() {
    let dir = tempdir().unwrap();
    let mut points = Vec::new();
    for i in 0..5 {
        for j in 0..5 {
            let (x, y) = (-5.0 + 5.0 * i as f64, -5.0 + 5.0 * j as f64);
            points.push((x, y, x + y, 2u8));
        }
    }
    let file = write_xyz(dir.path(), "grid.xyz", &points);
    let descriptor = file.to_str().unwrap();

    // Without a buffer only (5, 5) lies inside the window: nothing to interpolate.
    let mut source = PointCloudDataSource::from_descriptor(descriptor).unwrap();
    let (dem, report) =
        rasterize_with_report::<f32>(&params("1,9,8,8", 2.0, 0.0), &mut source).unwrap();
    assert_eq!(report.points_kept, 1);
    assert_eq!(report.cells_filled, 0);
    assert_eq!(dem.statistics().valid_count, 0);

    let mut source = PointCloudDataSource::from_descriptor(descriptor).unwrap();
    let (dem, report) =
        rasterize_with_report::<f32>(&params("1,9,8,8", 2.0, 5.0), &mut source).unwrap();
    assert_eq!(report.points_kept, 9);
    assert_eq!(report.cells_empty, 0);
    for row in 0..4u32 {
        for col in 0..4u32 {
            let c = dem
                .area()
                .to_geocoordinate(lidem_core::geo::RasterCoordinate::new(col, row));
            let v = dem.get(row as usize, col as usize).unwrap();
            assert_abs_diff_eq!(v as f64, c.x + c.y, epsilon = 1e-4);
        }
    }
}

#[test]
fn constant_field_is_exact() {
    let dir = tempdir().unwrap();
    let e = 412.5;
    let mut points = vec![
        (0.0, 0.0, e, 2u8),
        (20.0, 0.0, e, 2),
        (20.0, 20.0, e, 2),
        (0.0, 20.0, e, 2),
    ];
    points.extend([(3.3, 7.1), (12.9, 4.4), (16.0, 17.2), (8.8, 11.5)].map(|(x, y)| (x, y, e, 2)));
    let file = write_xyz(dir.path(), "flat.xyz", &points);

    let mut source = PointCloudDataSource::from_descriptor(file.to_str().unwrap()).unwrap();
    let dem: Raster<f64> = rasterize(&params("0,20,20,20", 1.0, 0.0), &mut source).unwrap();
    assert_eq!(dem.statistics().nodata_count, 0);
    for &v in dem.data().iter() {
        assert_abs_diff_eq!(v, e, epsilon = 1e-9);
    }
}

#[test]
fn unreadable_source_aborts() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("broken.xyz");
    fs::write(&file, "1 2 3\n4 5\n").unwrap();
    let mut source = PointCloudDataSource::from_descriptor(file.to_str().unwrap()).unwrap();
    assert!(rasterize::<f32>(&params("0,10,10,10", 1.0, 0.0), &mut source).is_err());
}
