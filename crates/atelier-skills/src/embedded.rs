//! The shipped core skill set, compiled into the binary.
//!
//! These definitions use the same JSON format and file-name rules as the
//! on-disk tiers; a disk-core or community definition with the same id
//! shadows the embedded one.

/// Compiled-in core definitions as `(name, json)` pairs.
pub const CORE_SKILLS: &[(&str, &str)] = &[
    ("core/resize.json", include_str!("../skills/core/resize.json")),
    ("core/grayscale.json", include_str!("../skills/core/grayscale.json")),
    ("core/blur.json", include_str!("../skills/core/blur.json")),
    ("core/compress.json", include_str!("../skills/core/compress.json")),
    (
        "core/convert_to_jpeg.json",
        include_str!("../skills/core/convert_to_jpeg.json"),
    ),
    (
        "core/convert_to_png.json",
        include_str!("../skills/core/convert_to_png.json"),
    ),
    (
        "core/switch_to_batch.json",
        include_str!("../skills/core/switch_to_batch.json"),
    ),
    (
        "core/switch_to_per_file.json",
        include_str!("../skills/core/switch_to_per_file.json"),
    ),
    (
        "core/set_output_folder.json",
        include_str!("../skills/core/set_output_folder.json"),
    ),
    (
        "core/set_naming_pattern.json",
        include_str!("../skills/core/set_naming_pattern.json"),
    ),
    (
        "core/set_accent_color.json",
        include_str!("../skills/core/set_accent_color.json"),
    ),
    ("core/export.json", include_str!("../skills/core/export.json")),
    ("core/clear_all.json", include_str!("../skills/core/clear_all.json")),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadOptions, Loader};
    use crate::types::ExecutorSpec;

    #[test]
    fn test_every_embedded_definition_loads() {
        let loader = Loader::new(LoadOptions {
            embedded: CORE_SKILLS,
            disk_core_root: None,
            community_root: None,
        });
        let issues = loader.load_all();
        assert!(issues.is_empty(), "embedded definitions must be valid: {issues:?}");
        assert_eq!(loader.list().len(), CORE_SKILLS.len());
    }

    #[test]
    fn test_meta_skills_are_flagged() {
        let loader = Loader::new(LoadOptions::default());
        let _ = loader.load_all();
        for id in ["export", "clear_all", "switch_to_batch", "switch_to_per_file"] {
            let skill = loader.get_by_id(id).unwrap();
            assert!(skill.is_meta, "{id} must be meta");
            assert_eq!(skill.executor, ExecutorSpec::Meta);
            assert_eq!(skill.driver, "meta");
        }
    }

    #[test]
    fn test_image_skills_declare_base_permissions_only() {
        let loader = Loader::new(LoadOptions::default());
        let _ = loader.load_all();
        for id in ["resize", "grayscale", "blur", "compress"] {
            let skill = loader.get_by_id(id).unwrap();
            assert_eq!(skill.driver, "image");
            assert!(!skill.requires_trust(), "{id} must not need trust");
        }
    }

    #[test]
    fn test_converts_declare_output_type() {
        let loader = Loader::new(LoadOptions::default());
        let _ = loader.load_all();
        assert_eq!(loader.get_by_id("convert_to_jpeg").unwrap().output_type, ".jpg");
        assert_eq!(loader.get_by_id("convert_to_png").unwrap().output_type, ".png");
    }
}
