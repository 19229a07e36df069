//! End-to-end sessions through the process-wide entry point.
//!
//! Each test works in its own file so they can run in parallel.

use nixmx::{nix_mx, startup, ClassId, HostValue, Options, Outputs};

fn setup() {
    startup(Options::default()).expect("startup should succeed");
}

fn call(nlhs: usize, command: &str, args: Vec<HostValue>) -> Outputs {
    let mut rhs = vec![HostValue::string(command)];
    rhs.extend(args);
    nix_mx(nlhs, &rhs).unwrap_or_else(|err| panic!("{} failed: {}", command, err))
}

fn first(nlhs: usize, command: &str, args: Vec<HostValue>) -> HostValue {
    call(nlhs, command, args)
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| panic!("{} returned nothing", command))
}

fn s(v: &str) -> HostValue {
    HostValue::string(v)
}

fn field(record: &HostValue, name: &str) -> HostValue {
    record
        .as_struct()
        .and_then(|r| r.field(0, name))
        .cloned()
        .unwrap_or_else(|| panic!("no field {}", name))
}

fn scratch_file() -> HostValue {
    let path = format!("/tmp/nixmx-{}.nix", uuid::Uuid::new_v4());
    first(1, "File::open", vec![s(&path), s("overwrite")])
}

fn destroy(handle: HostValue) {
    call(0, "Entity::destroy", vec![handle]);
}

#[test]
fn test_file_describe() {
    setup();
    let file = scratch_file();
    let info = first(1, "File::describe", vec![file.clone()]);
    assert_eq!(field(&info, "format"), s("nix"));
    assert!(field(&info, "location").as_str().unwrap().starts_with("/tmp/nixmx-"));
    assert!(field(&info, "createdAt").scalar_value::<u64>().unwrap() > 0);

    let updated = first(1, "Entity::updatedAt", vec![file.clone()]);
    assert!(updated.scalar_value::<u64>().unwrap() > 0);
    destroy(file);
}

#[test]
fn test_open_modes() {
    setup();
    let err = nix_mx(
        1,
        &[s("File::open"), s("/nonexistent/nixmx.nix"), s("readonly")],
    )
    .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");
    assert!(err.message.starts_with("File::open: "), "{}", err.message);

    let path = format!("/tmp/nixmx-{}.nix", uuid::Uuid::new_v4());
    let file = first(1, "File::open", vec![s(&path), HostValue::scalar(2.0f64)]);
    first(1, "File::createBlock", vec![file.clone(), s("b"), s("t")]);

    let reader = first(1, "File::open", vec![s(&path), HostValue::scalar(0u64)]);
    let blocks = first(1, "File::blocks", vec![reader.clone()]);
    assert_eq!(blocks.as_cell().unwrap().len(), 1);

    let err = nix_mx(1, &[s("File::createBlock"), reader.clone(), s("c"), s("t")]).unwrap_err();
    assert!(err.message.contains("read-only"), "{}", err.message);

    destroy(reader);
    destroy(file);
}

#[test]
fn test_data_array_session() {
    setup();
    let file = scratch_file();
    let block = first(1, "File::createBlock", vec![file.clone(), s("session"), s("recording")]);

    let da = first(
        1,
        "Block::createDataArray",
        vec![
            block.clone(),
            s("voltage"),
            s("nix.regular_sampled"),
            s("double"),
            HostValue::row(vec![2.0f64, 3.0]),
        ],
    );

    call(0, "DataArray::set_unit", vec![da.clone(), s("mV")]);
    call(0, "DataArray::set_label", vec![da.clone(), s("membrane potential")]);
    let info = first(1, "DataArray::describe", vec![da.clone()]);
    assert_eq!(field(&info, "name"), s("voltage"));
    assert_eq!(field(&info, "unit"), s("mV"));

    call(0, "DataArray::set_none_unit", vec![da.clone()]);
    let info = first(1, "DataArray::describe", vec![da.clone()]);
    assert_eq!(field(&info, "unit"), HostValue::Empty);

    let samples = HostValue::array(vec![2, 3], vec![1i32, 2, 3, 4, 5, 6]);
    call(0, "DataArray::writeAll", vec![da.clone(), samples.clone()]);
    let back = first(1, "DataArray::readAll", vec![da.clone()]);
    assert_eq!(back.class_id(), ClassId::Int32);
    assert_eq!(back, samples);

    let sampled = first(1, "DataArray::append_sampled_dimension", vec![da.clone(), HostValue::scalar(0.5f64)]);
    let set = first(1, "DataArray::append_set_dimension", vec![da.clone()]);
    call(0, "SetDimension::set_labels", vec![set.clone(), HostValue::cell(vec![s("a"), s("b"), s("c")])]);

    let index = first(1, "SampledDimension::index_of", vec![sampled.clone(), HostValue::scalar(1.0f64)]);
    assert_eq!(index, HostValue::scalar(2u64));
    let position = first(1, "SampledDimension::position_at", vec![sampled.clone(), HostValue::scalar(3.0f64)]);
    assert_eq!(position, HostValue::scalar(1.5f64));

    let dims = first(1, "DataArray::dimensions", vec![da.clone()]);
    let dims = dims.as_struct().unwrap();
    assert_eq!(dims.len(), 2);
    assert_eq!(dims.field(0, "dtype"), Some(&s("sample")));
    assert_eq!(dims.field(1, "dtype"), Some(&s("set")));

    let removed = first(1, "DataArray::delete_dimension", vec![da.clone(), HostValue::scalar(1u64)]);
    assert_eq!(removed, HostValue::logical(true));

    for h in [set, sampled, da, block, file] {
        destroy(h);
    }
}

#[test]
fn test_metadata_session() {
    setup();
    let file = scratch_file();
    let section = first(1, "File::createSection", vec![file.clone(), s("recording"), s("odml.recording")]);
    let sub = first(1, "Section::createSection", vec![section.clone(), s("amplifier"), s("hardware")]);

    let gain = first(
        1,
        "Section::createPropertyWithValue",
        vec![sub.clone(), s("gain"), HostValue::cell(vec![HostValue::scalar(10.0f64), HostValue::scalar(20.0f64)])],
    );
    let info = first(1, "Property::describe", vec![gain.clone()]);
    assert_eq!(field(&info, "datatype"), s("double"));

    let err = nix_mx(0, &[s("Property::updateValues"), gain.clone(), HostValue::cell(vec![s("high")])]);
    assert!(err.is_err(), "a string does not fit a double property");

    first(1, "Section::createProperty", vec![sub.clone(), s("model"), s("string")]);
    let props = first(1, "Section::properties", vec![sub.clone()]);
    let props = props.as_cell().unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(field(&props[0], "name"), s("gain"));
    let values = field(&props[0], "values");
    assert_eq!(values.as_cell().unwrap().len(), 2);

    let has = first(1, "Section::hasSection", vec![section.clone(), s("amplifier")]);
    assert_eq!(has, HostValue::logical(true));

    let block = first(1, "File::createBlock", vec![file.clone(), s("b"), s("t")]);
    call(0, "Block::set_metadata", vec![block.clone(), s("recording")]);
    let linked = first(1, "Block::openMetadataSection", vec![block.clone()]);
    let info = first(1, "Section::describe", vec![linked.clone()]);
    assert_eq!(field(&info, "name"), s("recording"));

    call(0, "Block::set_none_metadata", vec![block.clone()]);
    let none = first(1, "Block::openMetadataSection", vec![block.clone()]);
    assert_eq!(none, HostValue::Empty);

    for h in [linked, block, gain, sub, section, file] {
        destroy(h);
    }
}

#[test]
fn test_tags_and_deletion() {
    setup();
    let file = scratch_file();
    let block = first(1, "File::createBlock", vec![file.clone(), s("b"), s("t")]);
    let da = first(
        1,
        "Block::createDataArray",
        vec![block.clone(), s("spikes"), s("event"), s("double"), HostValue::row(vec![4.0f64])],
    );
    let tag = first(
        1,
        "Block::createTag",
        vec![block.clone(), s("stimulus"), s("nix.stimulus"), HostValue::row(vec![0.5f64])],
    );

    call(0, "Tag::addReference", vec![tag.clone(), s("spikes")]);
    let refs = first(1, "Tag::references", vec![tag.clone()]);
    assert_eq!(refs.as_cell().unwrap().len(), 1);

    let feature = first(1, "Tag::createFeature", vec![tag.clone(), s("spikes"), s("indexed")]);
    let info = first(1, "Feature::describe", vec![feature.clone()]);
    assert_eq!(field(&info, "link_type"), s("indexed"));

    let deleted = first(1, "Block::deleteDataArray", vec![block.clone(), s("spikes")]);
    assert_eq!(deleted, HostValue::logical(true));
    let refs = first(1, "Tag::references", vec![tag.clone()]);
    assert_eq!(refs.as_cell().unwrap().len(), 0);

    // The token survives, but the entity behind it is gone
    let err = nix_mx(1, &[s("DataArray::describe"), da.clone()]).unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");

    let again = first(1, "Block::deleteDataArray", vec![block.clone(), s("spikes")]);
    assert_eq!(again, HostValue::logical(false));

    for h in [feature, tag, da, block, file] {
        destroy(h);
    }
}

#[test]
fn test_destroy_is_final() {
    setup();
    let file = scratch_file();
    destroy(file.clone());

    let err = nix_mx(1, &[s("File::describe"), file.clone()]).unwrap_err();
    assert_eq!(err.identifier, "nix:handle:empty");
    let err = nix_mx(0, &[s("Entity::destroy"), file]).unwrap_err();
    assert_eq!(err.identifier, "nix:handle:empty");

    let err = nix_mx(1, &[s("File::describe"), HostValue::scalar(0u64)]).unwrap_err();
    assert_eq!(err.identifier, "nix:handle:empty");
}

#[test]
fn test_oversized_requests_are_refused() {
    setup();
    let file = scratch_file();
    let block = first(1, "File::createBlock", vec![file.clone(), s("b"), s("t")]);

    let err = nix_mx(
        1,
        &[
            s("Block::createDataArray"),
            block.clone(),
            s("huge"),
            s("t"),
            s("double"),
            HostValue::row(vec![1e6f64, 1e7]),
        ],
    )
    .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");
    assert!(err.message.contains("exceeds"), "{}", err.message);
    let arrays = first(1, "Block::dataArrays", vec![block.clone()]);
    assert_eq!(arrays.as_cell().unwrap().len(), 0);

    let da = first(
        1,
        "Block::createDataArray",
        vec![block.clone(), s("small"), s("t"), s("double"), HostValue::row(vec![4.0f64])],
    );
    let dim = first(1, "DataArray::append_sampled_dimension", vec![da.clone(), HostValue::scalar(1.0f64)]);
    let err = nix_mx(
        1,
        &[s("SampledDimension::axis"), dim.clone(), HostValue::scalar(4_398_046_511_104.0f64)],
    )
    .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");
    let axis = first(1, "SampledDimension::axis", vec![dim.clone(), HostValue::scalar(2u64)]);
    assert_eq!(axis, HostValue::row(vec![0.0f64, 1.0]));

    for h in [dim, da, block, file] {
        destroy(h);
    }
}

#[test]
fn test_tag_data_retrieval() {
    setup();
    let file = scratch_file();
    let block = first(1, "File::createBlock", vec![file.clone(), s("b"), s("t")]);
    let signal = first(
        1,
        "Block::createDataArray",
        vec![block.clone(), s("signal"), s("t"), s("double"), HostValue::row(vec![1.0f64, 10.0])],
    );
    let ramp: Vec<f64> = (0..10).map(f64::from).collect();
    call(0, "DataArray::writeAll", vec![signal.clone(), HostValue::row(ramp)]);

    let tag = first(
        1,
        "Block::createTag",
        vec![block.clone(), s("burst"), s("t"), HostValue::row(vec![0.0f64, 2.0])],
    );
    call(0, "Tag::set_extent", vec![tag.clone(), HostValue::row(vec![0.0f64, 3.0])]);
    call(0, "Tag::addReference", vec![tag.clone(), s("signal")]);

    let data = first(1, "Tag::retrieveData", vec![tag.clone(), HostValue::scalar(0u64)]);
    assert_eq!(data, HostValue::array(vec![1, 3], vec![2.0f64, 3.0, 4.0]));
    let err = nix_mx(1, &[s("Tag::retrieveData"), tag.clone(), HostValue::scalar(1u64)]).unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");

    let feature = first(1, "Tag::createFeature", vec![tag.clone(), s("signal"), s("untagged")]);
    let whole = first(1, "Tag::featureRetrieveData", vec![tag.clone(), HostValue::scalar(0u64)]);
    assert_eq!(whole.as_numeric().unwrap().dims, vec![1, 10]);

    // Positions (0, 1) and (0, 6), extents (0, 2) and (0, 1)
    let positions = first(
        1,
        "Block::createDataArray",
        vec![block.clone(), s("pos"), s("t"), s("double"), HostValue::row(vec![2.0f64, 2.0])],
    );
    call(
        0,
        "DataArray::writeAll",
        vec![positions.clone(), HostValue::array(vec![2, 2], vec![0.0f64, 0.0, 1.0, 6.0])],
    );
    let extents = first(
        1,
        "Block::createDataArray",
        vec![block.clone(), s("ext"), s("t"), s("double"), HostValue::row(vec![2.0f64, 2.0])],
    );
    call(
        0,
        "DataArray::writeAll",
        vec![extents.clone(), HostValue::array(vec![2, 2], vec![0.0f64, 0.0, 2.0, 1.0])],
    );

    let mt = first(1, "Block::createMultiTag", vec![block.clone(), s("events"), s("t"), s("pos")]);
    call(0, "MultiTag::addExtents", vec![mt.clone(), s("ext")]);
    call(0, "MultiTag::addReference", vec![mt.clone(), s("signal")]);

    let zero = HostValue::scalar(0u64);
    let one = HostValue::scalar(1u64);
    let data = first(1, "MultiTag::retrieveData", vec![mt.clone(), zero.clone(), zero.clone()]);
    assert_eq!(data, HostValue::array(vec![1, 2], vec![1.0f64, 2.0]));
    let data = first(1, "MultiTag::retrieveData", vec![mt.clone(), one.clone(), zero.clone()]);
    assert_eq!(data, HostValue::array(vec![1, 1], vec![6.0f64]));
    let err = nix_mx(
        1,
        &[s("MultiTag::retrieveData"), mt.clone(), HostValue::scalar(2u64), zero.clone()],
    )
    .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");

    let mt_feature = first(1, "MultiTag::createFeature", vec![mt.clone(), s("signal"), s("tagged")]);
    let data = first(1, "MultiTag::featureRetrieveData", vec![mt.clone(), one, zero]);
    assert_eq!(data, HostValue::array(vec![1, 1], vec![6.0f64]));

    for h in [mt_feature, mt, extents, positions, feature, tag, signal, block, file] {
        destroy(h);
    }
}
