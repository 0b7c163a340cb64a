use super::*;
use crate::image_pipeline::common::error::ConversionError;
use crate::image_pipeline::common::{Warning, Warnings};
use crate::image_pipeline::exposure::matrix::{SRGB_TO_XYZ, invert3};

#[test]
fn test_bayer_patterns() {
    let cases = [
        (CfaPattern::RGGB, [[0, 1], [1, 2]]),
        (CfaPattern::BGGR, [[2, 1], [1, 0]]),
        (CfaPattern::GRBG, [[1, 0], [2, 1]]),
        (CfaPattern::GBRG, [[1, 2], [0, 1]]),
    ];
    for (cfa, tile) in cases {
        for row in 0..8 {
            for col in 0..6 {
                assert_eq!(cfa.color_at(row, col), tile[row % 2][col % 2], "{:?}", cfa.name());
            }
        }
    }
}

#[test]
fn test_pattern_from_fn_and_offsets() {
    let cfa = CfaPattern::from_fn(|row, col| [[0, 1], [1, 2]][row % 2][col % 2]);
    assert_eq!(cfa, CfaPattern::RGGB);
    assert_eq!(cfa.filters(), 0x9494_9494);
    assert_eq!(cfa.color_at_offset(0, 0, -1, -1), 2);
    assert_eq!(cfa.color_at_offset(0, 0, 0, -1), 1);
    assert_eq!(CfaPattern::from_filters(0x1234_5678).name(), None);
}

#[test]
fn test_four_row_pattern() {
    // CMYG-style layout cycling through channels 0..3 every two rows
    let cfa = CfaPattern::from_fn(|row, col| (row / 2 + col) % 4);
    assert_eq!(cfa.color_at(2, 0), 1);
    assert_eq!(cfa.color_at(6, 1), 0);
    assert_eq!(cfa.color_at(8, 0), cfa.color_at(0, 0));
    assert_eq!(cfa.first_invalid(3), Some(3));
    assert_eq!(cfa.first_invalid(4), None);
}

#[test]
fn test_raw_image_rejects_bad_shapes() {
    assert!(matches!(
        RawImage::new(0, 4, 3, CfaPattern::RGGB),
        Err(ConversionError::InvalidDimensions(0, 4))
    ));
    assert!(matches!(
        RawImage::new(4, 4, 2, CfaPattern::RGGB),
        Err(ConversionError::InconsistentMetadata { .. })
    ));
    let cmyg = CfaPattern::from_fn(|row, col| (row + col) % 4);
    assert!(matches!(
        RawImage::new(4, 4, 3, cmyg),
        Err(ConversionError::InconsistentMetadata { .. })
    ));
    assert!(RawImage::new(4, 4, 4, cmyg).is_ok());
}

#[test]
fn test_sensor_layout_validation() {
    let layout = SensorLayout {
        raw_width: 10,
        raw_height: 6,
        top_margin: 2,
        left_margin: 3,
        width: 8,
        height: 4,
    };
    assert!(matches!(layout.validate(), Err(ConversionError::InconsistentMetadata { .. })));
    let layout = SensorLayout { width: 7, ..layout };
    assert!(layout.validate().is_ok());
    assert_eq!(layout.offset(0, 0), 23);
    assert_eq!(layout.offset(1, 2), 35);
}

#[test]
fn test_from_mosaic_cuts_visible_window() {
    let layout = SensorLayout {
        raw_width: 4,
        raw_height: 3,
        top_margin: 1,
        left_margin: 1,
        width: 2,
        height: 2,
    };
    let raw: Vec<u16> = (0..12).collect();
    let image = RawImage::from_mosaic(&layout, &raw, 3, CfaPattern::RGGB).unwrap();
    assert_eq!(image.len(), 4);
    assert_eq!(image.pixel(0, 0), &[5, 0, 0, 0]);
    assert_eq!(image.pixel(0, 1), &[0, 6, 0, 0]);
    assert_eq!(image.pixel(1, 0), &[0, 9, 0, 0]);
    assert_eq!(image.pixel(1, 1), &[0, 0, 10, 0]);

    let short = RawImage::from_mosaic(&layout, &raw[..11], 3, CfaPattern::RGGB);
    assert!(matches!(short, Err(ConversionError::DecodeError(_))));
}

#[test]
fn test_masked_black() {
    let layout = SensorLayout {
        raw_width: 4,
        raw_height: 2,
        top_margin: 0,
        left_margin: 1,
        width: 2,
        height: 2,
    };
    let raw = [10, 500, 500, 20, 30, 500, 500, 40];
    assert_eq!(layout.masked_black(&raw), Some(25));
    assert_eq!(SensorLayout::full(2, 2).masked_black(&raw[..4]), None);
}

fn to_bytes(samples: &[u16], order: ByteOrder) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| match order {
            ByteOrder::Little => s.to_le_bytes(),
            ByteOrder::Big => s.to_be_bytes(),
        })
        .collect()
}

#[test]
fn test_unpacked_reader_byte_orders() {
    let samples = [0x0102, 0x0304, 0x0506, 0x0708];
    for order in [ByteOrder::Little, ByteOrder::Big] {
        let mut reader = UnpackedReader::new(SensorLayout::full(2, 2), CfaPattern::RGGB, RawMetadata::default());
        reader.byte_order = order;
        let frame = reader.read_raw(&to_bytes(&samples, order)).unwrap();
        assert_eq!(frame.image.native(0, 0), 0x0102);
        assert_eq!(frame.image.native(1, 1), 0x0708);
    }
}

#[test]
fn test_unpacked_reader_short_input() {
    let reader = UnpackedReader::new(SensorLayout::full(4, 4), CfaPattern::RGGB, RawMetadata::default());
    assert!(matches!(reader.read_raw(&[0u8; 31]), Err(ConversionError::DecodeError(_))));
}

#[test]
fn test_unpacked_reader_margin_black() {
    let layout = SensorLayout {
        raw_width: 3,
        raw_height: 2,
        top_margin: 0,
        left_margin: 0,
        width: 2,
        height: 2,
    };
    let metadata = RawMetadata { black: 999, ..RawMetadata::default() };
    let mut reader = UnpackedReader::new(layout, CfaPattern::RGGB, metadata);
    reader.black_from_margin = true;
    let frame = reader.read_raw(&to_bytes(&[100, 200, 60, 300, 400, 64], ByteOrder::Little)).unwrap();
    assert_eq!(frame.metadata.black, 62);
    assert_eq!(frame.image.native(1, 1), 400);
}

#[test]
fn test_bad_pixel_radius_one() {
    let mut image = RawImage::new(5, 5, 3, CfaPattern::RGGB).unwrap();
    for row in 0..5 {
        for col in 0..5 {
            let c = image.cfa.color_at(row, col);
            image.pixel_mut(row, col)[c] = (row * 10 + col) as u16;
        }
    }
    // green at (row 2, col 1); its diagonal greens are 10, 12, 30, 32
    let mut warnings = Warnings::new();
    fix_bad_pixels(&mut image, &[(1, 2)], &mut warnings);
    assert_eq!(image.native(2, 1), 21);
    assert!(warnings.is_empty());
}

#[test]
fn test_bad_pixel_widens_to_radius_two() {
    let mut image = RawImage::new(5, 5, 3, CfaPattern::RGGB).unwrap();
    for row in (0..5).step_by(2) {
        for col in (0..5).step_by(2) {
            image.pixel_mut(row, col)[0] = 80;
        }
    }
    image.pixel_mut(2, 2)[0] = 4000;
    image.pixel_mut(0, 0)[0] = 160;
    let mut warnings = Warnings::new();
    fix_bad_pixels(&mut image, &[(2, 2)], &mut warnings);
    assert_eq!(image.native(2, 2), 90);
}

#[test]
fn test_bad_pixel_without_neighbours_is_reported() {
    let mut image = RawImage::new(2, 2, 3, CfaPattern::RGGB).unwrap();
    image.pixel_mut(0, 0)[0] = 77;
    let mut warnings = Warnings::new();
    fix_bad_pixels(&mut image, &[(0, 0), (9, 9)], &mut warnings);
    assert_eq!(image.native(0, 0), 77);
    assert_eq!(warnings.len(), 1);
    assert!(warnings.contains(&Warning::BadPixelUnrecoverable { col: 0, row: 0 }));
}

const CAMERA_XYZ: [[f32; 3]; 4] = [
    [0.6461, -0.0907, -0.0882],
    [-0.4300, 1.2184, 0.2378],
    [-0.0819, 0.1944, 0.5931],
    [0.0, 0.0, 0.0],
];

fn srgb_as_camera(scales: [f64; 3]) -> [[f32; 3]; 4] {
    let inverse = invert3(&SRGB_TO_XYZ).unwrap();
    let mut xyz_to_cam = [[0f32; 3]; 4];
    for i in 0..3 {
        for j in 0..3 {
            xyz_to_cam[i][j] = (inverse[i][j] * scales[i]) as f32;
        }
    }
    xyz_to_cam
}

#[test]
fn test_color_matrix_of_srgb_camera_is_identity() {
    // row scaling is normalized away
    for scales in [[1.0, 1.0, 1.0], [2.0, 1.0, 0.5]] {
        let matrix = RawLoaderReader::color_matrix(&srgb_as_camera(scales), 3).unwrap();
        for (i, row) in matrix.iter().enumerate() {
            for (j, &v) in row[..3].iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-4, "{matrix:?}");
            }
            assert_eq!(row[3], 0.0);
        }
    }
}

#[test]
fn test_color_matrix_maps_equal_responses_to_white() {
    let mut four = CAMERA_XYZ;
    four[3] = four[1];
    for (xyz_to_cam, colors) in [(CAMERA_XYZ, 3), (four, 4)] {
        let matrix = RawLoaderReader::color_matrix(&xyz_to_cam, colors).unwrap();
        for row in &matrix {
            let sum: f32 = row[..colors].iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "{matrix:?}");
        }
        // red comes mostly from the first camera channel
        assert!(matrix[0][0] > 1.0);
    }
}

#[test]
fn test_color_matrix_unknown_camera() {
    assert_eq!(RawLoaderReader::color_matrix(&[[0.0; 3]; 4], 3), None);
    assert_eq!(RawLoaderReader::color_matrix(&CAMERA_XYZ, 1), None);
}
