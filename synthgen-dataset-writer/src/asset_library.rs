//! Object meshes laid out as `<root>/<class>/<object>/*.obj`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use synthgen_core::{mesh::Mesh, PointCoordinates, Real};

#[derive(Clone, Debug)]
pub struct Asset {
    pub class: String,
    pub name: String,
    pub mesh: Arc<Mesh>,
}

#[derive(Debug, Default)]
pub struct AssetLibrary {
    classes: BTreeMap<String, Vec<Asset>>,
}

impl AssetLibrary {
    /// Loads every object folder that holds a readable `.obj`; the rest are skipped with a warning.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut library = Self::default();
        for class_dir in subdirectories(root)? {
            let folder = dir_name(&class_dir);
            let class = label_token(&folder);
            if class.is_empty() {
                log::warn!("class folder {folder:?} has no usable name, skipped");
                continue;
            }
            if class != folder {
                log::warn!("class folder {folder:?} labelled as {class}");
            }
            let mut assets = vec![];
            for object_dir in subdirectories(&class_dir)? {
                let name = dir_name(&object_dir);
                let Some(obj) = first_obj_file(&object_dir)? else {
                    log::warn!("{class}/{name}: no .obj file, skipped");
                    continue;
                };
                match load_obj(&obj) {
                    Ok(mesh) => assets.push(Asset {
                        class: class.clone(),
                        name,
                        mesh: Arc::new(mesh.recentered()),
                    }),
                    Err(e) => log::warn!("{class}/{name}: {e:#}, skipped"),
                }
            }
            log::info!("class {class}: {} objects", assets.len());
            library.classes.insert(class, assets);
        }
        Ok(library)
    }

    pub fn insert(&mut self, mut asset: Asset) {
        asset.class = label_token(&asset.class);
        self.classes.entry(asset.class.clone()).or_default().push(asset);
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn class(&self, class: &str) -> &[Asset] {
        self.classes.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every asset of the listed classes. Unknown class names are reported and ignored.
    pub fn assets_of<'a>(&'a self, classes: &'a [String]) -> Vec<&'a Asset> {
        let mut assets = vec![];
        for class in classes {
            match self.classes.get(&label_token(class)) {
                Some(found) => assets.extend(found),
                None => log::warn!("class {class} not found in the asset library"),
            }
        }
        assets
    }

    /// Every asset whose class is not listed.
    pub fn assets_except(&self, classes: &[String]) -> Vec<&Asset> {
        let classes: Vec<_> = classes.iter().map(|c| label_token(c)).collect();
        self.classes
            .iter()
            .filter(|(name, _)| !classes.contains(name))
            .flat_map(|(_, assets)| assets)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All models of an OBJ file merged into one triangulated mesh.
pub fn load_obj(path: &Path) -> Result<Mesh> {
    let options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj(path, &options)
        .with_context(|| format!("loading {}", path.display()))?;

    let mut vertices = vec![];
    let mut triangles = vec![];
    for model in models {
        let offset = vertices.len() as u32;
        vertices.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| PointCoordinates::new(p[0] as Real, p[1] as Real, p[2] as Real)),
        );
        triangles.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }
    if vertices.is_empty() {
        bail!("{} has no vertices", path.display());
    }
    Ok(Mesh::new(vertices, triangles))
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn first_obj_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
        })
        .collect();
    files.sort();
    Ok(files.into_iter().next())
}

/// Class name as written to label files: whitespace runs become a single `_`, since label
/// fields are whitespace separated.
pub fn label_token(class: &str) -> String {
    class.split_whitespace().collect::<Vec<_>>().join("_")
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_PAIR: &str = "\
v 1 1 1
v 3 1 1
v 3 3 1
v 1 3 5
f 1 2 3 4
";

    #[test]
    fn scans_classes_and_skips_broken_objects() {
        let root = tempfile::tempdir().unwrap();
        let can = root.path().join("can/red_can");
        fs::create_dir_all(&can).unwrap();
        fs::write(can.join("model.OBJ"), TRIANGLE_PAIR).unwrap();
        fs::write(can.join("model.mtl"), "").unwrap();
        fs::create_dir_all(root.path().join("can/no_mesh")).unwrap();
        let empty = root.path().join("plant/fern");
        fs::create_dir_all(&empty).unwrap();
        fs::write(empty.join("fern.obj"), "# nothing here\n").unwrap();

        let library = AssetLibrary::scan(root.path()).unwrap();
        assert_eq!(library.class_names().collect::<Vec<_>>(), vec!["can", "plant"]);
        assert_eq!(library.len(), 1);
        assert!(library.class("plant").is_empty());

        let asset = &library.class("can")[0];
        assert_eq!(asset.name, "red_can");
        assert_eq!(asset.mesh.vertices.len(), 4);
        // quad face triangulated
        assert_eq!(asset.mesh.triangles.len(), 2);
        let (min, max) = asset.mesh.bounds().unwrap();
        assert_eq!(min + max, PointCoordinates::zeros());
    }

    #[test]
    fn class_names_with_spaces_become_single_tokens() {
        let root = tempfile::tempdir().unwrap();
        let car = root.path().join("toy car/red van");
        fs::create_dir_all(&car).unwrap();
        fs::write(car.join("van.obj"), TRIANGLE_PAIR).unwrap();
        fs::create_dir_all(root.path().join("   ")).unwrap();

        let library = AssetLibrary::scan(root.path()).unwrap();
        assert_eq!(library.class_names().collect::<Vec<_>>(), vec!["toy_car"]);
        assert_eq!(library.class("toy_car")[0].name, "red van");
        assert_eq!(library.assets_of(&["toy car".to_string()]).len(), 1);
        assert!(library.assets_except(&["toy  car".to_string()]).is_empty());

        let record = visbox::YoloRecord {
            label: library.class("toy_car")[0].class.clone(),
            bbox: visbox::YoloBox {
                center_x: 0.5,
                center_y: 0.5,
                width: 0.25,
                height: 0.125,
            },
        };
        let parsed = visbox::parse_label_line(&record.to_string()).unwrap();
        assert_eq!(parsed.label, "toy_car");
    }

    #[test]
    fn target_and_distractor_partition() {
        let mesh = Arc::new(Mesh::cube(1.0));
        let mut library = AssetLibrary::default();
        for (class, name) in [("can", "a"), ("can", "b"), ("car", "c"), ("plant", "d")] {
            library.insert(Asset {
                class: class.to_string(),
                name: name.to_string(),
                mesh: mesh.clone(),
            });
        }
        let targets = vec!["can".to_string(), "ghost".to_string()];
        let names = |assets: Vec<&Asset>| assets.iter().map(|a| a.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(library.assets_of(&targets)), vec!["a", "b"]);
        assert_eq!(names(library.assets_except(&targets)), vec!["c", "d"]);
    }
}
