use super::*;

#[test]
fn new_rejects_wrong_length() {
    assert!(Frame::new(2, 2, vec![0; 15]).is_err());
    assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn clones_share_until_written() {
    let a = Frame::filled(2, 1, Rgba8::rgb(10, 20, 30));
    let mut b = a.clone();
    assert!(a.ptr_eq(&b));
    b.data_mut()[0] = 99;
    assert!(!a.ptr_eq(&b));
    assert_eq!(a.pixel(0, 0), [10, 20, 30, 255]);
    assert_eq!(b.pixel(0, 0), [99, 20, 30, 255]);
}

#[test]
fn empty_sentinel() {
    let f = Frame::empty();
    assert!(f.is_empty());
    assert!(f.data().is_empty());
    assert!(!Frame::transparent(1, 1).is_empty());
}

#[test]
fn premul_roundtrip_is_close() {
    let f = Frame::new(1, 1, vec![200, 100, 50, 128]).unwrap();
    let premul = f.to_premul();
    assert_eq!(premul, vec![100, 50, 25, 128]);
    let back = Frame::from_premul(1, 1, premul).unwrap();
    for (a, b) in back.data().iter().zip(f.data()) {
        assert!((i16::from(*a) - i16::from(*b)).abs() <= 1);
    }
}

#[test]
fn crop_clips_to_bounds() {
    let mut f = Frame::transparent(4, 4);
    let i = (2 * 4 + 3) * 4;
    f.data_mut()[i..i + 4].copy_from_slice(&[1, 2, 3, 4]);
    let c = f.crop(2, 1, 10, 2);
    assert_eq!((c.width(), c.height()), (2, 2));
    assert_eq!(c.pixel(1, 1), [1, 2, 3, 4]);
}
