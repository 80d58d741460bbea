use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

pub const HANDPOSE_MODEL_FILENAME: &str = "handpose_estimation_mediapipe_2023feb.onnx";
pub const HANDPOSE_MODEL_URL: &str = "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx";
pub const GESTURE_MODEL_FILENAME: &str = "gesture_classifier.onnx";
pub const GESTURE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/gesture_classifier.onnx";

/// A model file and where to fetch it from when it is missing locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAsset {
    pub name: String,
    pub url: String,
    pub path: PathBuf,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            path: path.into(),
        }
    }

    pub fn handpose(model_dir: &Path) -> Self {
        Self::new(
            "handpose estimator",
            HANDPOSE_MODEL_URL,
            model_dir.join(HANDPOSE_MODEL_FILENAME),
        )
    }

    pub fn gesture_classifier(model_dir: &Path) -> Self {
        Self::new(
            "gesture classifier",
            GESTURE_MODEL_URL,
            model_dir.join(GESTURE_MODEL_FILENAME),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent,
    Started { total: Option<u64> },
    Progress { downloaded: u64, total: Option<u64> },
    Finished,
}

/// Makes sure `asset.path` exists, downloading it with a console progress bar
/// if needed. The file only appears at its final path once fully written.
pub fn ensure_model_ready<F>(asset: &ModelAsset, mut on_event: F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if asset.path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent);
        on_event(ModelDownloadEvent::Finished);
        return Ok(());
    }

    if let Some(parent) = asset.path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    let mut progress: Option<ProgressBar> = None;
    download_to_path(asset, &mut |event| {
        match &event {
            ModelDownloadEvent::Started { total } => {
                progress = Some(create_progress_bar(*total));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} ready", asset.name));
                }
            }
            ModelDownloadEvent::AlreadyPresent => {}
        }
        on_event(event);
    })
    .with_context(|| {
        format!(
            "failed to download {} model to {}",
            asset.name,
            asset.path.display()
        )
    })
}

fn download_to_path<F>(asset: &ModelAsset, on_event: &mut F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {} to {}",
        asset.name,
        asset.url,
        asset.path.display()
    );

    let mut response = Client::new()
        .get(&asset.url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total = response.content_length();
    on_event(ModelDownloadEvent::Started { total });

    let tmp_path = asset.path.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .context("failed while writing model to disk")?;
        downloaded += read as u64;
        on_event(ModelDownloadEvent::Progress { downloaded, total });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    drop(file);
    fs::rename(&tmp_path, &asset.path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            tmp_path.display(),
            asset.path.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished);
    Ok(())
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread,
    };

    fn serve_once(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
        });
        format!("http://{addr}/model.onnx")
    }

    #[test]
    fn existing_model_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let asset = ModelAsset::new("test", "http://127.0.0.1:9/unused", dir.path().join("m.onnx"));
        fs::write(&asset.path, b"model").unwrap();

        let mut events = Vec::new();
        ensure_model_ready(&asset, |evt| events.push(evt)).unwrap();
        assert_eq!(
            events,
            vec![ModelDownloadEvent::AlreadyPresent, ModelDownloadEvent::Finished]
        );
    }

    #[test]
    fn downloads_missing_model_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(b"onnx-bytes");
        let asset = ModelAsset::new("test", url, dir.path().join("nested").join("m.onnx"));

        let mut events = Vec::new();
        ensure_model_ready(&asset, |evt| events.push(evt)).unwrap();

        assert_eq!(fs::read(&asset.path).unwrap(), b"onnx-bytes");
        assert!(!asset.path.with_extension("download").exists());
        assert_eq!(events.first(), Some(&ModelDownloadEvent::Started { total: Some(10) }));
        assert_eq!(events.last(), Some(&ModelDownloadEvent::Finished));
    }

    #[test]
    fn unreachable_host_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let asset = ModelAsset::new("test", format!("http://{addr}/m"), dir.path().join("m.onnx"));
        assert!(ensure_model_ready(&asset, |_| {}).is_err());
        assert!(!asset.path.exists());
    }
}
