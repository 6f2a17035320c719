//! Single-page upload UI

use crate::server::AppState;
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Sheet Music Player</title>
    <style>
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #1a1a1a;
            color: #e0e0e0;
            max-width: 720px;
            margin: 0 auto;
            padding: 20px;
            line-height: 1.6;
        }
        #preview img, #preview embed { width: 100%; border: 1px solid #3a3a3a; margin-top: 12px; }
        #preview embed { height: 480px; }
        button {
            background: #4a9eff; color: #fff; border: 0; border-radius: 4px;
            padding: 10px 18px; font-size: 16px; cursor: pointer; margin-top: 12px;
        }
        button:disabled { background: #555; cursor: wait; }
        #status { margin-top: 16px; padding: 12px; border-radius: 4px; background: #2a2a2a; display: none; }
        #status.running { border-left: 4px solid #4a9eff; }
        #status.complete { border-left: 4px solid #4caf50; }
        #status.error { border-left: 4px solid #f44336; }
        #status .label { font-weight: bold; }
        #result { margin-top: 16px; display: none; }
        #result audio { width: 100%; }
        a { color: #4a9eff; }
    </style>
</head>
<body>
    <h1>🎼 AI Sheet Music Player</h1>
    <p>Upload a PDF or Image.</p>

    <input type="file" id="file" accept=".pdf,.png,.jpg,.jpeg,application/pdf,image/png,image/jpeg">
    <div id="preview"></div>
    <button id="generate" disabled>▶️ Generate Audio</button>

    <div id="status"><div class="label"></div><ul class="log"></ul></div>

    <div id="result">
        <audio id="player" controls></audio>
        <p><a id="download" download="__DOWNLOAD_NAME__">⬇️ Download MP3</a></p>
    </div>

    <script>
    const fileInput = document.getElementById('file');
    const preview = document.getElementById('preview');
    const button = document.getElementById('generate');
    const status = document.getElementById('status');
    const label = status.querySelector('.label');
    const log = status.querySelector('.log');
    const result = document.getElementById('result');
    let previewUrl = null;
    let audioUrl = null;

    function setStatus(state, text) {
        status.style.display = 'block';
        status.className = state;
        label.textContent = text;
    }

    function note(text) {
        const li = document.createElement('li');
        li.textContent = text;
        log.appendChild(li);
        return li;
    }

    fileInput.addEventListener('change', () => {
        preview.innerHTML = '';
        result.style.display = 'none';
        status.style.display = 'none';
        if (previewUrl) URL.revokeObjectURL(previewUrl);
        const file = fileInput.files[0];
        button.disabled = !file;
        if (!file) return;
        previewUrl = URL.createObjectURL(file);
        const el = document.createElement(file.type === 'application/pdf' ? 'embed' : 'img');
        el.src = previewUrl;
        if (el.tagName === 'EMBED') el.type = 'application/pdf';
        el.alt = 'Preview';
        preview.appendChild(el);
    });

    const events = new EventSource('/events');
    const downloads = {};
    events.addEventListener('stage', (e) => note(JSON.parse(e.data).label));
    events.addEventListener('download', (e) => {
        const d = JSON.parse(e.data);
        const pct = d.total > 0 ? Math.round(d.done / d.total * 100) + '%' : (d.done / 1e6).toFixed(1) + ' MB';
        if (!downloads[d.asset]) downloads[d.asset] = note('');
        downloads[d.asset].textContent = '⬇️ Downloading ' + d.asset + ': ' + pct;
    });

    button.addEventListener('click', async () => {
        const file = fileInput.files[0];
        if (!file) return;
        button.disabled = true;
        log.innerHTML = '';
        result.style.display = 'none';
        setStatus('running', 'Initializing...');

        const body = new FormData();
        body.append('file', file, file.name);
        try {
            const resp = await fetch('/api/convert', { method: 'POST', body });
            if (!resp.ok) {
                let message = resp.statusText;
                try { message = (await resp.json()).error.message; } catch (_) {}
                throw new Error(message);
            }
            const blob = await resp.blob();
            if (audioUrl) URL.revokeObjectURL(audioUrl);
            audioUrl = URL.createObjectURL(blob);
            document.getElementById('player').src = audioUrl;
            document.getElementById('download').href = audioUrl;
            result.style.display = 'block';
            setStatus('complete', '✅ Done!');
        } catch (err) {
            setStatus('error', '❌ Failed');
            note('Error: ' + err.message);
        } finally {
            button.disabled = false;
        }
    });
    </script>
</body>
</html>
"#;

/// GET /
pub async fn root_page(State(state): State<AppState>) -> impl IntoResponse {
    Html(PAGE.replace("__DOWNLOAD_NAME__", &state.config.audio.download_name))
}
