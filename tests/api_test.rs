#![allow(missing_docs)]

use paramfile::{
    LookupParameterStorage, Model, ModelReader, ModelWriter, ParamFileError, ParameterCollection,
    ParameterStorage, Result, Shape,
};

fn ramp(len: usize, start: f32, step: f32) -> Vec<f32> {
    (0..len).map(|i| start + step * i as f32).collect()
}

// Two parameters and one lookup table with distinct, non-trivial contents.
fn create_model() -> Model {
    let mut model = Model::new();
    let w = model.add_parameters(Shape::from([3, 4]));
    w.values_mut().copy_from_slice(&ramp(12, 0.1, 0.37));
    w.grads_mut().copy_from_slice(&ramp(12, -1.0, 0.013));

    let b = model.add_parameters(Shape::from([3]));
    b.values_mut().copy_from_slice(&[1.0 / 3.0, -2.5e-7, 42.0]);

    let e = model.add_lookup_parameters(5, Shape::from([2]));
    e.values_mut().copy_from_slice(&ramp(10, 7.0, -0.77));
    e.grads_mut().copy_from_slice(&ramp(10, 0.0, 1e-3));
    model
}

// Same layout, zero-filled.
fn create_empty_model() -> Model {
    let mut model = Model::new();
    model.add_parameters(Shape::from([3, 4]));
    model.add_parameters(Shape::from([3]));
    model.add_lookup_parameters(5, Shape::from([2]));
    model
}

#[test]
fn test_save_then_populate_all_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("model.txt");
    let model = create_model();

    let mut writer = ModelWriter::create(&path)?;
    writer.save_model(&model, "")?;
    drop(writer);

    let mut restored = create_empty_model();
    ModelReader::new(&path).populate_model(&mut restored, "")?;

    assert_eq!(restored.parameters(), model.parameters());
    assert_eq!(restored.lookup_parameters(), model.lookup_parameters());
    Ok(())
}

#[test]
fn test_memory_io_round_trip() -> Result<()> {
    let model = create_model();
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_model(&model, "")?;
    let bytes = writer.into_inner()?;
    assert!(!bytes.is_empty());

    let mut restored = create_empty_model();
    ModelReader::from_bytes(bytes).populate_model(&mut restored, "")?;
    assert_eq!(restored, model);
    Ok(())
}

#[test]
fn test_populate_all_rejects_extra_records() -> Result<()> {
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_model(&create_model(), "")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut smaller = Model::new();
    smaller.add_parameters(Shape::from([3, 4]));
    smaller.add_lookup_parameters(5, Shape::from([2]));

    let err = reader.populate_model(&mut smaller, "").unwrap_err();
    assert!(matches!(err, ParamFileError::Mismatch(_)), "{err}");
    assert!(err.is_runtime());
    Ok(())
}

#[test]
fn test_populate_all_rejects_missing_records() -> Result<()> {
    let model = create_model();
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_model(&model, "")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut larger = create_empty_model();
    larger.add_parameters(Shape::from([1]));

    let err = reader.populate_model(&mut larger, "").unwrap_err();
    assert!(matches!(err, ParamFileError::Mismatch(_)), "{err}");
    // Not atomic: the handles that did match were already filled.
    assert_eq!(larger.parameters()[0], model.parameters()[0]);
    Ok(())
}

#[test]
fn test_populate_all_is_positional_not_nominal() -> Result<()> {
    let mut source = Model::new();
    source
        .add_parameters_named(Shape::from([2]), "first")?
        .values_mut()
        .copy_from_slice(&[1.0, 2.0]);
    source
        .add_parameters_named(Shape::from([2]), "second")?
        .values_mut()
        .copy_from_slice(&[3.0, 4.0]);
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_model(&source, "")?;

    // Names in the target are swapped; records still land by order.
    let mut target = Model::new();
    target.add_parameters_named(Shape::from([2]), "second")?;
    target.add_parameters_named(Shape::from([2]), "first")?;
    ModelReader::from_bytes(writer.into_inner()?).populate_model(&mut target, "")?;

    assert_eq!(target.parameters()[0].name(), "/second");
    assert_eq!(target.parameters()[0].values(), &[1.0, 2.0]);
    assert_eq!(target.parameters()[1].values(), &[3.0, 4.0]);
    Ok(())
}

#[test]
fn test_save_model_reroots_under_key() -> Result<()> {
    let mut encoder = Model::with_fullname("/enc")?;
    assert_eq!(encoder.fullname(), "/enc/");
    encoder
        .add_parameters_named(Shape::from([2]), "W")?
        .values_mut()
        .copy_from_slice(&[0.5, -0.5]);
    encoder.add_lookup_parameters_named(3, Shape::from([1]), "E")?;

    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_model(&encoder, "/dec")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut target = Model::new();
    let w = reader.load_param(&mut target, "/dec/W")?;
    assert_eq!(w.name(), "/dec/W");
    assert_eq!(w.values(), &[0.5, -0.5]);

    let e = reader.load_lookup_param(&mut target, "/dec/E")?;
    assert_eq!(e.rows(), 3);
    assert_eq!(e.inner_shape(), &Shape::from([1]));
    Ok(())
}

#[test]
fn test_populate_all_with_prefix_consumes_only_subtree() -> Result<()> {
    let mut writer = ModelWriter::from_writer(Vec::new());

    let mut a = Model::with_fullname("/a")?;
    a.add_parameters_named(Shape::from([2]), "x")?
        .values_mut()
        .copy_from_slice(&[1.0, 1.5]);
    let mut b = Model::with_fullname("/ab")?;
    b.add_parameters_named(Shape::from([2]), "y")?
        .values_mut()
        .copy_from_slice(&[9.0, 9.0]);

    writer.save_model(&b, "")?;
    writer.save_model(&a, "")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    // "/a" normalizes to "/a/", so "/ab/y" is not part of the subtree.
    let mut target = Model::with_fullname("/a")?;
    target.add_parameters_named(Shape::from([2]), "x")?;
    reader.populate_model(&mut target, "/a")?;
    assert_eq!(target.parameters()[0].values(), &[1.0, 1.5]);

    let err = reader.populate_model(&mut target, "").unwrap_err();
    assert!(matches!(err, ParamFileError::Mismatch(_)));
    Ok(())
}

#[test]
fn test_save_and_populate_single_param_by_key() -> Result<()> {
    let model = create_model();
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_param(&model.parameters()[1], "/b")?;
    writer.save_param(&model.parameters()[0], "/w")?;
    writer.save_lookup_param(&model.lookup_parameters()[0], "/e")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut w = ParameterStorage::new("w", Shape::from([3, 4]));
    reader.populate_param(&mut w, "/w")?;
    assert_eq!(w.values(), model.parameters()[0].values());
    assert_eq!(w.grads(), model.parameters()[0].grads());
    assert_eq!(w.name(), "w");

    let mut e = LookupParameterStorage::new("e", 5, Shape::from([2]));
    reader.populate_lookup_param(&mut e, "/e")?;
    assert_eq!(e.values(), model.lookup_parameters()[0].values());
    assert_eq!(e.row(4), model.lookup_parameters()[0].row(4));

    // A parameter record never satisfies a lookup-parameter request.
    let mut wrong_kind = LookupParameterStorage::new("e", 3, Shape::from([4]));
    let err = reader.populate_lookup_param(&mut wrong_kind, "/w").unwrap_err();
    assert!(matches!(err, ParamFileError::KeyNotFound(ref k) if k == "/w"));
    Ok(())
}

#[test]
fn test_save_param_uses_stored_name_without_key() -> Result<()> {
    let model = create_model();
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_param(&model.parameters()[0], "")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut target = Model::new();
    let loaded = reader.load_param(&mut target, "/_0")?;
    assert_eq!(loaded.values(), model.parameters()[0].values());
    Ok(())
}

#[test]
fn test_load_param_creates_handle() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("single.txt");
    let mut source = ParameterStorage::new("orig", Shape::from([2, 3]));
    source.values_mut().copy_from_slice(&ramp(6, -3.0, 1.25));
    source.grads_mut().copy_from_slice(&ramp(6, 0.5, 0.5));

    ModelWriter::create(&path)?.save_param(&source, "/w1")?;

    let mut model = Model::new();
    model.add_parameters(Shape::from([1]));
    let reader = ModelReader::new(&path);
    let loaded = reader.load_param(&mut model, "/w1")?;
    assert_eq!(loaded.name(), "/w1");
    assert_eq!(loaded.shape(), &Shape::from([2, 3]));
    assert_eq!(loaded.values(), source.values());
    assert_eq!(loaded.grads(), source.grads());
    assert_eq!(model.parameters().len(), 2);

    let err = reader.load_param(&mut model, "/nope").unwrap_err();
    assert!(matches!(err, ParamFileError::KeyNotFound(_)));
    assert!(err.is_runtime());
    assert_eq!(model.parameters().len(), 2);
    Ok(())
}

#[test]
fn test_load_lookup_param_splits_rows() -> Result<()> {
    let mut source = LookupParameterStorage::new("emb", 4, Shape::from([2, 3]));
    assert_eq!(source.all_shape(), Shape::from([2, 3, 4]));
    source.values_mut().copy_from_slice(&ramp(24, 1.0, 0.1));
    source
        .row_mut(2)
        .expect("row 2 exists")
        .copy_from_slice(&[-1.0; 6]);

    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_lookup_param(&source, "/emb")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut model = Model::new();
    let loaded = reader.load_lookup_param(&mut model, "/emb")?;
    assert_eq!(loaded.rows(), 4);
    assert_eq!(loaded.inner_shape(), &Shape::from([2, 3]));
    assert_eq!(loaded.name(), "/emb");
    assert_eq!(loaded.row(2), Some(&[-1.0f32; 6][..]));
    assert_eq!(loaded.values(), source.values());
    assert_eq!(model.lookup_parameters().len(), 1);
    Ok(())
}

#[test]
fn test_shape_mismatch_leaves_handle_untouched() -> Result<()> {
    let mut source = ParameterStorage::new("w", Shape::from([3, 4]));
    source.values_mut().fill(1.0);
    let mut writer = ModelWriter::from_writer(Vec::new());
    writer.save_param(&source, "/w")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut target = ParameterStorage::new("w", Shape::from([4, 3]));
    target.values_mut().fill(7.0);
    let err = reader.populate_param(&mut target, "/w").unwrap_err();
    assert!(matches!(err, ParamFileError::Mismatch(_)), "{err}");
    assert!(target.values().iter().all(|&v| v == 7.0));

    let mut model = Model::new();
    model.add_parameters(Shape::from([4, 3])).values_mut().fill(7.0);
    let err = reader.populate_model(&mut model, "").unwrap_err();
    assert!(matches!(err, ParamFileError::Mismatch(_)));
    assert!(model.parameters()[0].values().iter().all(|&v| v == 7.0));
    Ok(())
}

#[test]
fn test_append_mode_keeps_earlier_records() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("appended.txt");
    let mut p1 = ParameterStorage::new("p1", Shape::from([2]));
    p1.values_mut().copy_from_slice(&[1.0, 2.0]);
    let mut p2 = ParameterStorage::new("p2", Shape::from([3]));
    p2.values_mut().copy_from_slice(&[3.0, 4.0, 5.0]);

    {
        let mut writer = ModelWriter::create(&path)?;
        writer.save_param(&p1, "/w1")?;
    }
    {
        let mut writer = ModelWriter::append(&path)?;
        writer.save_param(&p2, "/w2")?;
    }

    let reader = ModelReader::new(&path);
    let mut model = Model::new();
    assert_eq!(reader.load_param(&mut model, "/w1")?.values(), &[1.0, 2.0]);
    assert_eq!(reader.load_param(&mut model, "/w2")?.values(), &[3.0, 4.0, 5.0]);

    // A truncating writer starts over.
    ModelWriter::create(&path)?.save_param(&p2, "/w2")?;
    let err = reader.load_param(&mut model, "/w1").unwrap_err();
    assert!(matches!(err, ParamFileError::KeyNotFound(_)));
    Ok(())
}

#[test]
fn test_writer_offset_matches_file_length() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("offset.txt");
    let mut writer = ModelWriter::create(&path)?;
    writer.save_model(&create_model(), "")?;
    let written = writer.offset();
    drop(writer);
    assert_eq!(std::fs::metadata(&path)?.len(), written);
    Ok(())
}

#[test]
fn test_invalid_keys_fail_before_io() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("does-not-exist.txt");
    let reader = ModelReader::new(&missing);
    let mut model = Model::new();
    let mut param = ParameterStorage::new("p", Shape::from([1]));
    let mut lookup = LookupParameterStorage::new("l", 1, Shape::from([1]));

    let errors = [
        reader.populate_param(&mut param, "").unwrap_err(),
        reader.populate_lookup_param(&mut lookup, "").unwrap_err(),
        reader.load_param(&mut model, "").unwrap_err(),
        reader.load_lookup_param(&mut model, "").unwrap_err(),
        reader.populate_model(&mut model, "has space").unwrap_err(),
    ];
    for err in errors {
        assert!(matches!(err, ParamFileError::InvalidArgument(_)), "{err}");
        assert!(!err.is_runtime());
    }

    let mut writer = ModelWriter::from_writer(Vec::new());
    let err = writer.save_param(&param, "a b").unwrap_err();
    assert!(matches!(err, ParamFileError::InvalidArgument(_)));
    let err = writer.save_lookup_param(&lookup, "a#b").unwrap_err();
    assert!(matches!(err, ParamFileError::InvalidArgument(_)));
    let err = writer.save_model(&create_model(), "rel").unwrap_err();
    assert!(matches!(err, ParamFileError::InvalidArgument(_)));
    assert_eq!(writer.offset(), 0);
    Ok(())
}

#[test]
fn test_unopenable_files_are_io_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("no-such-dir").join("model.txt");

    let err = ModelWriter::create(&missing).unwrap_err();
    assert!(matches!(err, ParamFileError::Io(_)), "{err}");
    assert!(std::error::Error::source(&err).is_some());

    let mut model = create_empty_model();
    let err = ModelReader::new(&missing)
        .populate_model(&mut model, "")
        .unwrap_err();
    assert!(matches!(err, ParamFileError::Io(_)), "{err}");
    assert!(err.to_string().contains("model.txt"));
    Ok(())
}

#[test]
fn test_model_naming() -> Result<()> {
    let mut root = Model::new();
    assert_eq!(root.add_parameters(Shape::from([1])).name(), "/_0");
    assert_eq!(root.add_lookup_parameters(2, Shape::from([1])).name(), "/_1");
    assert_eq!(root.add_parameters(Shape::from([1])).name(), "/_2");

    let mut enc = root.sub("enc")?;
    assert_eq!(enc.fullname(), "/enc/");
    assert_eq!(enc.add_parameters(Shape::from([1])).name(), "/enc/_0");
    assert_eq!(enc.sub("attn")?.fullname(), "/enc/attn/");

    assert!(matches!(root.sub("a/b"), Err(ParamFileError::InvalidArgument(_))));
    assert!(matches!(root.sub("a b"), Err(ParamFileError::InvalidArgument(_))));
    assert!(matches!(
        Model::with_fullname("enc"),
        Err(ParamFileError::InvalidArgument(_))
    ));
    assert!(matches!(
        root.add_parameters_named(Shape::from([1]), "has#hash"),
        Err(ParamFileError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_writer_options() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("options.txt");
    let model = create_model();

    // A buffer smaller than one record still produces a complete file.
    let mut writer = paramfile::WriterOptions::new().buffer_size(16).open(&path)?;
    writer.save_model(&model, "")?;
    drop(writer);

    let mut writer = paramfile::WriterOptions::new()
        .append(true)
        .open(&path)?;
    writer.save_model(&model, "/copy")?;
    drop(writer);

    let reader = ModelReader::new(&path);
    let mut copy = create_empty_model();
    reader.populate_model(&mut copy, "/copy")?;
    assert_eq!(copy, model);

    let mut target = Model::new();
    let original = reader.load_param(&mut target, "/_1")?;
    assert_eq!(original.values(), model.parameters()[1].values());
    Ok(())
}

#[test]
fn test_populate_all_under_relative_prefix() -> Result<()> {
    let mut writer = ModelWriter::from_writer(Vec::new());
    let mut p = ParameterStorage::new("p", Shape::from([2]));
    p.values_mut().copy_from_slice(&[0.75, -0.75]);
    writer.save_param(&p, "rel/w")?;
    writer.save_param(&p, "other/w")?;
    let reader = ModelReader::from_bytes(writer.into_inner()?);

    let mut model = Model::new();
    model.add_parameters(Shape::from([2]));
    reader.populate_model(&mut model, "rel")?;
    assert_eq!(model.parameters()[0].values(), &[0.75, -0.75]);

    let err = reader.populate_model(&mut model, "rel#").unwrap_err();
    assert!(matches!(err, ParamFileError::InvalidArgument(_)));
    Ok(())
}
