//! The seam to material metadata, which lives outside the compiler.

/// What the compiler needs to know about a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialInfo {
    /// Brushes using it seal the map and fill BSP leaves.
    pub opaque: bool,
    /// Faces using it produce render triangles.
    pub drawn: bool,
    /// Brushes using it separate areas (visportals).
    pub area_portal: bool,
    /// Surfaces using it are never merged with anything else (mirrors, GUIs).
    pub discrete: bool,
}

impl MaterialInfo {
    pub const SOLID: MaterialInfo = MaterialInfo {
        opaque: true,
        drawn: true,
        area_portal: false,
        discrete: false,
    };
}

/// Resolves a material name. Implemented by the editor's material system;
/// closures work too.
pub trait MaterialLookup {
    fn material_info(&self, name: &str) -> MaterialInfo;
}

impl<F: Fn(&str) -> MaterialInfo> MaterialLookup for F {
    fn material_info(&self, name: &str) -> MaterialInfo {
        self(name)
    }
}

/// Classifies materials by the usual id-Tech naming conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMaterials;

impl MaterialLookup for DefaultMaterials {
    fn material_info(&self, name: &str) -> MaterialInfo {
        let name = name.to_ascii_lowercase();
        if name.ends_with("visportal") || name.ends_with("areaportal") {
            return MaterialInfo {
                opaque: false,
                drawn: false,
                area_portal: true,
                discrete: false,
            };
        }
        if name.ends_with("caulk") || name.ends_with("nodraw") {
            return MaterialInfo { drawn: false, ..MaterialInfo::SOLID };
        }
        if name.starts_with("textures/editor/") || name.ends_with("clip") || name.contains("trigger") {
            return MaterialInfo {
                opaque: false,
                drawn: false,
                area_portal: false,
                discrete: false,
            };
        }
        MaterialInfo {
            discrete: name.contains("mirror") || name.contains("/gui"),
            ..MaterialInfo::SOLID
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conventions() {
        let lookup = DefaultMaterials;
        assert_eq!(lookup.material_info("textures/base_wall/panel1"), MaterialInfo::SOLID);
        let portal = lookup.material_info("textures/editor/visportal");
        assert!(portal.area_portal && !portal.opaque && !portal.drawn);
        let caulk = lookup.material_info("textures/common/caulk");
        assert!(caulk.opaque && !caulk.drawn);
        assert!(lookup.material_info("textures/common/mirror").discrete);
    }
}
