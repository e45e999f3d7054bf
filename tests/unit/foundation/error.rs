use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        DanceError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(DanceError::bake("x").to_string().contains("bake error:"));
    assert!(DanceError::render("x").to_string().contains("render error:"));
    assert!(DanceError::encode("x").to_string().contains("encode error:"));
    assert!(DanceError::audio("x").to_string().contains("audio error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = DanceError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
