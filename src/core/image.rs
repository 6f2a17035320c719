use crate::{
    error::{PlayerError, Result},
    types::InputKind,
};
use image::{DynamicImage, ImageFormat};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info};

/// Fixed name of the normalized page inside the scratch directory.
pub const NORMALIZED_NAME: &str = "input_score.png";

/// Turns page 1 of a PDF into a raster image. Implementations never look at
/// later pages.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize_first_page(&self, pdf: &Path, dpi: u32) -> Result<DynamicImage>;
}

/// Poppler's `pdftoppm`.
pub struct Pdftoppm {
    program: String,
}

impl Pdftoppm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(pdf: &Path, out_prefix: &Path, dpi: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-f", "1", "-l", "1", "-r"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(dpi.to_string().into());
        args.push("-png".into());
        args.push("-singlefile".into());
        args.push(pdf.as_os_str().to_os_string());
        args.push(out_prefix.as_os_str().to_os_string());
        args
    }
}

impl PdfRasterizer for Pdftoppm {
    fn rasterize_first_page(&self, pdf: &Path, dpi: u32) -> Result<DynamicImage> {
        let prefix = pdf.with_file_name("page");
        let output = Command::new(&self.program)
            .args(Self::args(pdf, &prefix, dpi))
            .output()
            .map_err(|e| PlayerError::Tool {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(PlayerError::Image(format!(
                "could not rasterize PDF: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let png = prefix.with_extension("png");
        debug!("Rasterized {} -> {}", pdf.display(), png.display());
        Ok(image::open(&png)?)
    }
}

/// Identifies the upload by content, falling back to its extension.
pub fn detect_kind(bytes: &[u8], file_name: &str) -> Result<InputKind> {
    if let Some(t) = infer::get(bytes) {
        return match t.mime_type() {
            "application/pdf" => Ok(InputKind::Pdf),
            "image/png" => Ok(InputKind::Png),
            "image/jpeg" => Ok(InputKind::Jpeg),
            other => Err(PlayerError::UnsupportedInput(other.to_string())),
        };
    }

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => Ok(InputKind::Pdf),
        Some("png") => Ok(InputKind::Png),
        Some("jpg") | Some("jpeg") => Ok(InputKind::Jpeg),
        _ => Err(PlayerError::UnsupportedInput(file_name.to_string())),
    }
}

/// Writes the upload as an 8-bit RGB PNG at `workdir/input_score.png`.
///
/// Alpha, grayscale and palette images are converted; the engine fails on
/// transparency. No resizing or cleanup is done.
pub fn normalize_image(
    bytes: &[u8],
    file_name: &str,
    workdir: &Path,
    rasterizer: &dyn PdfRasterizer,
    dpi: u32,
) -> Result<PathBuf> {
    let output_path = workdir.join(NORMALIZED_NAME);

    let img = match detect_kind(bytes, file_name)? {
        InputKind::Pdf => {
            let temp_pdf = workdir.join("temp.pdf");
            fs::write(&temp_pdf, bytes)?;
            rasterizer.rasterize_first_page(&temp_pdf, dpi)?
        }
        InputKind::Png | InputKind::Jpeg => image::load_from_memory(bytes)?,
    };

    let rgb = match img {
        DynamicImage::ImageRgb8(buf) => buf,
        other => {
            info!("Converting {:?} to RGB", other.color());
            other.to_rgb8()
        }
    };

    rgb.save_with_format(&output_path, ImageFormat::Png)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdftoppm_requests_only_first_page() {
        let args = Pdftoppm::args(Path::new("/w/temp.pdf"), Path::new("/w/page"), 200);
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-f", "1", "-l", "1", "-r", "200", "-png", "-singlefile", "/w/temp.pdf", "/w/page"]
        );
    }

    #[test]
    fn kind_from_magic_bytes_beats_extension() {
        assert_eq!(detect_kind(b"%PDF-1.7\n...", "scan.png").unwrap(), InputKind::Pdf);
    }

    #[test]
    fn kind_falls_back_to_extension() {
        assert_eq!(detect_kind(b"", "Score.JPG").unwrap(), InputKind::Jpeg);
        assert_eq!(detect_kind(b"", "score.pdf").unwrap(), InputKind::Pdf);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = detect_kind(b"hello", "notes.txt").unwrap_err();
        assert!(matches!(err, PlayerError::UnsupportedInput(_)));
    }
}
