use std::{fs, io, ops::Index, path::Path};

/// Classes of the bundled olive disease model, in output order.
pub const OLIVE_DISEASE_LABELS: [&str; 5] = [
    "Healthy",
    "Anthracnose",
    "Cercospora Leaf Spot",
    "Peacock Spot",
    "Verticillium Wilt",
];

/// Index of the class meaning that no disease was detected.
pub const HEALTHY_INDEX: usize = 0;

/// Ordered class names matching the output vector of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(OLIVE_DISEASE_LABELS)
    }
}

impl LabelTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads one label per line, skipping blank lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let table = Self::parse(&content);
        if table.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "the label file does not contain any label",
            ));
        }
        Ok(table)
    }

    fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Index<usize> for LabelTable {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        &self.labels[index]
    }
}
