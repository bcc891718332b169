use crate::error::ConfigError;
use crate::object_detection::object_detection_utils::read_classes_txt_file;
use image::Rgb;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Color drawn for class ids the map knows nothing about.
pub const NEUTRAL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Color for known classes past the end of the fixed palette.
pub const UNPALETTED_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Fixed colors for the first eleven classes.
pub const DEFAULT_PALETTE: [Rgb<u8>; 11] = [
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 255, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
    Rgb([128, 0, 0]),
    Rgb([0, 128, 0]),
    Rgb([0, 0, 128]),
    Rgb([128, 128, 0]),
    Rgb([128, 0, 128]),
];

/// Maps class ids to the color their boxes are drawn in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassColorMap {
    colors: HashMap<usize, Rgb<u8>>,
}

impl ClassColorMap {
    pub fn new(colors: HashMap<usize, Rgb<u8>>) -> Self {
        ClassColorMap { colors }
    }

    /// One entry per class: the fixed palette first, gray after that.
    pub fn for_classes(num_classes: usize) -> Self {
        let colors = (0..num_classes)
            .map(|class_id| {
                let color = DEFAULT_PALETTE
                    .get(class_id)
                    .copied()
                    .unwrap_or(UNPALETTED_COLOR);
                (class_id, color)
            })
            .collect();
        ClassColorMap { colors }
    }

    pub fn get(&self, class_id: usize) -> Option<Rgb<u8>> {
        self.colors.get(&class_id).copied()
    }

    /// The mapped color, or [`NEUTRAL_COLOR`] when the class has none.
    pub fn color_for(&self, class_id: usize) -> Rgb<u8> {
        self.get(class_id).unwrap_or(NEUTRAL_COLOR)
    }

    pub fn insert(&mut self, class_id: usize, color: Rgb<u8>) {
        self.colors.insert(class_id, color);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Reads color overrides from a json object such as `{"0": [255, 0, 0], "3": [0, 0, 0]}`.
pub fn read_colors_json(filepath: &Path) -> Result<HashMap<usize, Rgb<u8>>, ConfigError> {
    let file = File::open(filepath).map_err(|source| ConfigError::Io {
        path: filepath.to_path_buf(),
        source,
    })?;
    let raw: HashMap<String, [u8; 3]> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Json {
            path: filepath.to_path_buf(),
            source,
        })?;
    raw.into_iter()
        .map(|(key, rgb)| {
            let class_id = key.trim().parse::<usize>().map_err(|e| ConfigError::InvalidColor {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Ok((class_id, Rgb(rgb)))
        })
        .collect()
}

/// Class names and colors, loaded once at startup and shared by reference afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassCatalog {
    names: Vec<String>,
    colors: ClassColorMap,
}

impl ClassCatalog {
    pub fn from_names(names: Vec<String>) -> Self {
        let colors = ClassColorMap::for_classes(names.len());
        ClassCatalog { names, colors }
    }

    /// Loads class names from a txt file and applies optional color overrides from json.
    pub fn load(classes_path: &Path, colors_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut catalog = ClassCatalog::from_names(read_classes_txt_file(classes_path)?);
        if let Some(colors_path) = colors_path {
            for (class_id, color) in read_colors_json(colors_path)? {
                catalog.colors.insert(class_id, color);
            }
        }
        Ok(catalog)
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn colors(&self) -> &ClassColorMap {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
