//! Remote path convention for project images
//!
//! ```text
//! images/obra-{id:02}/capa.{ext}
//! images/obra-{id:02}/img-{seq:02}.{ext}
//! ```

use crate::project::ProjectId;

pub const DEFAULT_EXTENSION: &str = "jpg";

/// Lower-cased text after the last dot of a local file name
///
/// Only ASCII letters and digits are accepted, since the extension ends up
/// in a URL path; anything else, or no extension at all, gives `jpg`.
pub fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Path of the project's cover image
pub fn cover_path(project: ProjectId, file_name: &str) -> String {
    format!("{}/capa.{}", project.image_dir(), extension_of(file_name))
}

/// Path of the `sequence`-th (1-based) progress photo
pub fn progress_path(project: ProjectId, sequence: usize, file_name: &str) -> String {
    format!(
        "{}/img-{:02}.{}",
        project.image_dir(),
        sequence,
        extension_of(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_with_default() {
        assert_eq!(extension_of("IMG_0001.JPEG"), "jpeg");
        assert_eq!(extension_of("planta.final.PNG"), "png");
        assert_eq!(extension_of("sem_extensao"), "jpg");
        assert_eq!(extension_of("ponto."), "jpg");
        assert_eq!(extension_of(".heic"), "heic");
    }

    #[test]
    fn unsafe_extensions_fall_back() {
        assert_eq!(extension_of("foto.x#y"), "jpg");
        assert_eq!(extension_of("foto.jpg?v=2"), "jpg");
        assert_eq!(extension_of("foto.j p"), "jpg");
        assert_eq!(extension_of("fotos.d/sem_extensao"), "jpg");
        assert_eq!(
            progress_path(ProjectId(4), 1, "foto.x#y"),
            "images/obra-04/img-01.jpg"
        );
    }

    #[test]
    fn cover_path_uses_padded_id() {
        assert_eq!(cover_path(ProjectId(7), "Frente.PNG"), "images/obra-07/capa.png");
    }

    #[test]
    fn progress_paths_follow_staging_order() {
        let names = ["A.png", "B.jpg", "C.jpg"];
        let paths: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| progress_path(ProjectId(2), i + 1, name))
            .collect();
        assert_eq!(
            paths,
            vec![
                "images/obra-02/img-01.png",
                "images/obra-02/img-02.jpg",
                "images/obra-02/img-03.jpg",
            ]
        );
    }
}
