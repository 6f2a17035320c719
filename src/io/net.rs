use crate::{config::NetConfig, error::Result};
use reqwest::blocking::Client;
use std::{
    fs,
    fs::File,
    io::{Read, Write},
    path::Path,
    time::Duration,
};

pub fn http_client(cfg: &NetConfig) -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// Streams `url` into `dest`, reporting `(downloaded, total)` after each chunk.
///
/// Bytes land in `<dest>.part` first. They are renamed into place only once
/// the body has been read completely and `verify` has accepted the part file,
/// so a file at `dest` is always a complete, verified one.
pub fn download_with_progress(
    client: &Client,
    url: &str,
    dest: &Path,
    on_progress: &dyn Fn(u64, u64),
    verify: &dyn Fn(&Path) -> Result<()>,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = part_path(dest);

    let result = stream_to(client, url, &tmp, on_progress)
        .and_then(|downloaded| verify(&tmp).map(|()| downloaded));
    if result.is_err() {
        fs::remove_file(&tmp).ok();
    }
    let downloaded = result?;

    if dest.exists() {
        fs::remove_file(dest).ok();
    }

    fs::rename(&tmp, dest)?;

    on_progress(downloaded, downloaded);

    Ok(())
}

fn stream_to(client: &Client, url: &str, tmp: &Path, on_progress: &dyn Fn(u64, u64)) -> Result<u64> {
    let mut resp = client.get(url).send()?.error_for_status()?;

    let total = resp.content_length().unwrap_or(0);

    on_progress(0, total);

    let mut file = File::create(tmp)?;
    let mut downloaded: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = resp.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        downloaded += n as u64;
        on_progress(downloaded, total);
    }
    file.flush()?;
    Ok(downloaded)
}

fn part_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
