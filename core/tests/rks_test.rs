use fakhivets_core::rks::read_rks;

fn image_bytes(start: u16, end: u16, content: &[u8], checksum: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&start.to_le_bytes());
    out.extend_from_slice(&end.to_le_bytes());
    out.extend_from_slice(content);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

#[test]
fn test_loads_a_tiny_program_image() {
    let bytes = image_bytes(0x4000, 0x4003, &[0xC3, 0x00, 0x40, 0x00], 0x1234);
    let image = read_rks(&bytes[..]).unwrap();
    assert_eq!(image.start_address, 0x4000);
    assert_eq!(image.end_address, 0x4003);
    assert_eq!(image.content, vec![0xC3, 0x00, 0x40, 0x00]);
}

#[test]
fn test_single_byte_image_is_still_valid() {
    let bytes = image_bytes(0x5000, 0x5000, &[0x76], 0);
    let image = read_rks(&bytes[..]).unwrap();
    assert_eq!(image.content, vec![0x76]);
}
