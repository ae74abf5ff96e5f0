use image::{ImageBuffer, Luma, Rgb, RgbImage};
use rag_merge::{find_boundaries, label2rgb_avg, mark_boundaries, BoundaryMode, Labels};

fn strip(labels: &[u32]) -> Labels {
    ImageBuffer::from_fn(labels.len() as u32, 1, |x, _y| Luma([labels[x as usize]]))
}

#[test]
fn average_color_is_truncated_per_region() {
    let labels = strip(&[0, 0, 1]);
    let img: RgbImage = ImageBuffer::from_fn(3, 1, |x, _y| match x {
        0 => Rgb([10, 0, 7]),
        1 => Rgb([21, 4, 8]),
        _ => Rgb([99, 98, 97]),
    });
    let out = label2rgb_avg(&labels, &img, None).expect("render should succeed");
    assert_eq!(out.get_pixel(0, 0).0, [15, 2, 7]);
    assert_eq!(out.get_pixel(1, 0).0, [15, 2, 7]);
    assert_eq!(out.get_pixel(2, 0).0, [99, 98, 97]);
}

#[test]
fn background_label_gets_fixed_color() {
    let labels = strip(&[0, 1]);
    let img: RgbImage = ImageBuffer::from_fn(2, 1, |_x, _y| Rgb([50, 60, 70]));
    let out = label2rgb_avg(&labels, &img, Some((0, [1, 2, 3]))).unwrap();
    assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3]);
    assert_eq!(out.get_pixel(1, 0).0, [50, 60, 70]);
}

#[test]
fn boundary_modes() {
    let labels = strip(&[0, 0, 1, 1]);
    assert_eq!(find_boundaries(&labels, BoundaryMode::Thick, 0), vec![false, true, true, false]);
    assert_eq!(find_boundaries(&labels, BoundaryMode::Inner, 0), vec![false, false, true, false]);
    assert_eq!(find_boundaries(&labels, BoundaryMode::Outer, 0), vec![false, true, false, false]);
}

#[test]
fn outer_mode_keeps_pixels_between_two_objects() {
    let labels = strip(&[1, 1, 2, 2]);
    assert_eq!(find_boundaries(&labels, BoundaryMode::Outer, 0), vec![false, true, true, false]);
}

#[test]
fn uniform_labels_have_no_boundary() {
    let labels: Labels = ImageBuffer::from_fn(5, 4, |_x, _y| Luma([3]));
    assert!(find_boundaries(&labels, BoundaryMode::Thick, 0).iter().all(|b| !b));
}

#[test]
fn marks_only_boundary_pixels() {
    let labels = strip(&[0, 0, 1, 1]);
    let img: RgbImage = ImageBuffer::from_fn(4, 1, |_x, _y| Rgb([200, 200, 200]));
    let out = mark_boundaries(&img, &labels, [0, 0, 0], BoundaryMode::Thick, 0).unwrap();
    let row: Vec<[u8; 3]> = (0..4).map(|x| out.get_pixel(x, 0).0).collect();
    assert_eq!(row, vec![[200, 200, 200], [0, 0, 0], [0, 0, 0], [200, 200, 200]]);
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let labels = strip(&[0, 1]);
    let img: RgbImage = ImageBuffer::new(3, 1);
    assert!(label2rgb_avg(&labels, &img, None).is_err());
    assert!(mark_boundaries(&img, &labels, [0, 0, 0], BoundaryMode::Thick, 0).is_err());
}
