//! Size, budget and state-machine behavior of the container.

use big::format::{decode_chunk, encode_chunk, ChunkIter, MAGIC};
use big::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `images` float images of `w` x `h`, every sample equal to its image index.
fn float_stack(images: u64, w: u64, h: u64) -> Result<OContainer> {
    let mut out = OContainer::new();
    out.set_number_of_images(images)?;
    out.set_image_width(w)?;
    out.set_image_height(h)?;
    for i in 0..images {
        out.write_image(i, &vec![i as f32; (w * h) as usize])?;
    }
    Ok(out)
}

#[test]
fn test_scenario_a_image_sizes() -> Result<()> {
    let mut out = OContainer::new();
    out.set_image_width(4)?;
    out.set_image_height(4)?;
    out.set_number_of_planes(1)?;
    out.set_number_of_tiles(1)?;
    out.set_data_type(&[DataType::Float])?;

    assert_eq!(out.image_size_raw(), 16);
    assert_eq!(out.image_size(DataType::Float), 64);
    assert_eq!(out.get_image_type(DataType::Float.id())?, 4);
    Ok(())
}

#[test]
fn test_scenario_b_greedy_load_under_budget() -> Result<()> {
    init_tracing();
    let bytes = float_stack(10, 4, 4)?.to_bytes()?;

    let mut reader = IContainer::from_bytes(bytes)?;
    assert_eq!(reader.image_size(DataType::Float), 64);
    assert_eq!(reader.size(), 640);

    reader.set_memory_size(320);
    let loaded = reader.load_greedy()?;

    assert_eq!(loaded, 5);
    assert_eq!(reader.outermost_entities_offsets(), &[0, 1, 2, 3, 4]);
    assert!(!reader.is_in_memory());
    assert_eq!(reader.size_in_memory(), 320);
    assert_eq!(reader.state(), ContainerState::PartiallyLoaded);

    let err = reader.load_next().unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { requested: 64, resident: 320, limit: 320 }));
    assert_eq!(reader.size_in_memory(), 320);
    assert_eq!(reader.read_image::<f32>(4)?, vec![4.0; 16]);
    Ok(())
}

#[test]
fn test_scenario_c_memory_size_without_load() {
    let mut out = OContainer::new();
    out.set_memory_size(1000);
    out.set_memory_size(500);
    assert!(out.is_empty());
    assert_eq!(out.memory_size(), 500);
    assert_eq!(out.state(), ContainerState::Empty);
}

#[test]
fn test_scenario_d_mutation_after_load() -> Result<()> {
    let mut out = float_stack(1, 2, 2)?;
    assert!(!out.is_empty());

    let err = out.set_image_width(8).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(out.image_width(), 2);

    out.clear();
    out.set_image_width(8)?;
    assert_eq!(out.image_width(), 8);
    Ok(())
}

#[test]
fn test_clear_resets_dataset_but_keeps_ceiling() -> Result<()> {
    let mut reader = IContainer::from_bytes(float_stack(3, 2, 2)?.to_bytes()?)?;
    reader.set_memory_size(4096);
    reader.load_all()?;
    assert_eq!(reader.state(), ContainerState::FullyLoaded);

    reader.clear();
    assert!(reader.is_empty());
    assert_eq!(reader.size_in_memory(), 0);
    assert!(reader.outermost_entities_offsets().is_empty());
    assert_eq!(reader.memory_size(), 4096);

    assert_eq!(reader.size(), 0);
    assert_eq!(reader.number_of_images(), 0);

    let mut out = float_stack(3, 2, 2)?;
    out.clear();
    assert!(out.is_empty());
    assert_eq!(out.size(), 0);
    assert_eq!(out.size_in_memory(), 0);
    assert_eq!(out.image_width(), 0);
    assert!(out.is_in_memory());

    reader.load_all()?;
    assert_eq!(reader.number_of_images(), 3);
    assert_eq!(reader.read_image::<f32>(2)?, vec![2.0; 4]);
    Ok(())
}

#[test]
fn test_in_memory_tracks_sizes_across_loads_and_clears() -> Result<()> {
    let mut reader = IContainer::from_bytes(float_stack(4, 3, 1)?.to_bytes()?)?;
    reader.set_memory_size(24);

    let check = |r: &IContainer| assert_eq!(r.is_in_memory(), r.size_in_memory() == r.size());
    check(&reader);
    reader.load_image(3)?;
    check(&reader);
    reader.load_image(1)?;
    check(&reader);
    assert!(reader.load_image(0).is_err());
    check(&reader);
    assert!(reader.release_image(3));
    reader.load_image(0)?;
    check(&reader);
    assert_eq!(reader.outermost_entities_offsets(), &[0, 1]);
    reader.clear();
    check(&reader);

    reader.reset_memory_size();
    assert_eq!(reader.memory_size(), DEFAULT_MEMORY_SIZE);
    reader.load_all()?;
    check(&reader);
    assert!(reader.is_in_memory());
    Ok(())
}

#[test]
fn test_shrinking_ceiling_keeps_residency() -> Result<()> {
    let mut reader = IContainer::from_bytes(float_stack(4, 1, 1)?.to_bytes()?)?;
    reader.load_image(0)?;
    reader.load_image(1)?;
    reader.set_memory_size(4);

    assert_eq!(reader.size_in_memory(), 8);
    assert!(matches!(reader.load_image(2), Err(Error::CapacityExceeded { .. })));
    assert_eq!(reader.outermost_entities_offsets(), &[0, 1]);
    Ok(())
}

#[test]
fn test_uniform_data_type() -> Result<()> {
    let mut out = OContainer::new();
    out.set_data_type(&[DataType::Float])?;
    assert!(out.is_uniform_data_type());

    out.set_data_type(&[DataType::Float, DataType::Int])?;
    assert!(!out.is_uniform_data_type());

    out.set_number_of_images(3)?;
    out.set_data_type(&[DataType::Float; 3])?;
    assert!(out.is_uniform_data_type());
    Ok(())
}

#[test]
fn test_unknown_type_id_rejected_at_assignment() {
    let mut out = OContainer::new();
    assert!(matches!(out.set_data_type_ids(&[2, 0]), Err(Error::UnsupportedDataType(0))));
    assert!(matches!(out.get_image_type(13), Err(Error::UnsupportedDataType(13))));
    assert_eq!(out.data_type(), &[DataType::Float]);
}

#[test]
fn test_chunk_roundtrip_and_bad_magic() -> Result<()> {
    for payload in [&b""[..], &[0xAB; 3][..], &42u64.to_le_bytes()[..]] {
        let encoded = encode_chunk(0x1234, payload);
        let (chunk, used) = decode_chunk(&encoded, 0)?;
        assert_eq!(chunk.id, 0x1234);
        assert_eq!(chunk.length(), payload.len() as u64);
        assert_eq!(chunk.payload, payload);
        assert_eq!(used, encoded.len());
    }

    let mut bytes = float_stack(1, 1, 1)?.to_bytes()?;
    assert!(ChunkIter::new(&bytes).is_ok());
    bytes[..8].copy_from_slice(b"NOTBIG!!");
    assert!(matches!(ChunkIter::new(&bytes), Err(Error::CorruptFormat(_))));
    assert!(matches!(IContainer::from_bytes(bytes), Err(Error::CorruptFormat(_))));
    assert_eq!(&MAGIC[..3], b"BIG");
    Ok(())
}

#[test]
fn test_alternate_data_order_roundtrips_but_cannot_load() -> Result<()> {
    let order = DataOrder::new(&[Axis::Planes, Axis::Images, Axis::Tiles, Axis::Height, Axis::Width])?;
    let mut out = OContainer::new();
    out.set_data_order(order.clone())?;
    assert!(matches!(out.load_image(0, &[]), Err(Error::ImageOutOfBounds { .. })));

    let reader = IContainer::from_bytes(out.to_bytes()?)?;
    assert_eq!(reader.data_order(), &order);

    let mut out = OContainer::new();
    out.set_number_of_images(1)?;
    out.set_image_width(1)?;
    out.set_image_height(1)?;
    out.set_data_order(order)?;
    assert!(matches!(
        out.write_image(0, &[1.0f32]),
        Err(Error::UnsupportedDataOrder(Axis::Planes))
    ));
    assert!(out.is_empty());
    Ok(())
}
