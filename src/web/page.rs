/// Single-page front end with the text, face and voice panels
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Mental Health - AI Emotion Detection</title>
<style>
  body { margin: 0; background: #0f1115; color: #e6eef3; font-family: system-ui, sans-serif; }
  main { max-width: 860px; margin: 0 auto; padding: 24px; }
  h1, h2 { color: #eaf6ff; }
  .card { background: #0f1419; border-radius: 12px; padding: 18px; margin-bottom: 24px;
          box-shadow: 0 6px 18px rgba(0, 0, 0, 0.6); }
  button { background: linear-gradient(90deg, #6DD56D, #1fa23a); color: #021004; padding: .55rem 1rem;
           border-radius: 10px; border: none; font-weight: 700; cursor: pointer;
           transition: transform .12s ease, filter .12s ease; }
  button:hover { filter: brightness(1.08); transform: translateY(-2px) scale(1.02); }
  button:disabled { filter: grayscale(1); cursor: default; transform: none; }
  textarea, input { background: #0b0d0f; color: #e6eef3; border: 1px solid #2a3038; border-radius: 8px; }
  textarea { width: 100%; min-height: 100px; padding: 8px; box-sizing: border-box; }
  video, canvas { max-width: 100%; border-radius: 8px; }
  .row { display: flex; gap: 8px; margin-top: 10px; flex-wrap: wrap; }
  .result { margin-top: 12px; padding: 10px; border-radius: 8px; display: none; }
  .success { background: #12351c; display: block; }
  .info { background: #132a40; display: block; }
  .warning { background: #3d3212; display: block; }
  .error { background: #401616; display: block; }
</style>
</head>
<body>
<main>
  <h1>&#129504; Mental Health - AI Emotion Detection</h1>

  <section class="card" id="text-panel">
    <h2>1&#65039;&#8419; Detect Emotion from Text</h2>
    <label for="text-input">Enter how you're feeling (text):</label>
    <textarea id="text-input"></textarea>
    <div class="row">
      <button id="analyze-text">Analyze Text</button>
      <button id="suggest-text" style="display:none">Get Suggestion (Text)</button>
    </div>
    <div class="result" id="text-result"></div>
    <div class="result" id="text-suggestion"></div>
  </section>

  <section class="card" id="face-panel">
    <h2>2&#65039;&#8419; Detect Emotion from Face</h2>
    <video id="camera" autoplay playsinline width="320" height="240"></video>
    <canvas id="snapshot" width="320" height="240" style="display:none"></canvas>
    <div class="row">
      <button id="start-camera">Start Camera</button>
      <button id="capture" disabled>Capture your face</button>
      <input type="file" id="face-file" accept="image/png,image/jpeg">
    </div>
    <div class="result" id="face-result"></div>
    <div class="result" id="face-suggestion"></div>
  </section>

  <section class="card" id="voice-panel">
    <h2>3&#65039;&#8419; Detect Emotion from Voice</h2>
    <input type="file" id="voice-file" accept=".wav,.mp3,audio/wav,audio/mpeg">
    <div class="result info" id="voice-result">Please upload a WAV or MP3 audio file to analyze.</div>
    <div class="result" id="voice-suggestion"></div>
  </section>
</main>
<script>
  const show = (id, kind, html) => {
    const el = document.getElementById(id);
    el.className = 'result ' + kind;
    el.innerHTML = html;
  };
  const hide = (id) => { document.getElementById(id).className = 'result'; };
  const capitalize = (s) => s.charAt(0).toUpperCase() + s.slice(1);
  const escape = (s) => s.replace(/[&<>"']/g, (c) => '&#' + c.charCodeAt(0) + ';');

  async function call(url, options) {
    const response = await fetch(url, options);
    const body = await response.json().catch(() => ({ error: response.statusText }));
    if (!response.ok) throw new Error(body.error || response.statusText);
    return body;
  }

  let textSuggestion = null;
  document.getElementById('analyze-text').onclick = async () => {
    const text = document.getElementById('text-input').value;
    hide('text-suggestion');
    if (!text.trim()) {
      show('text-result', 'warning', 'Please enter some text before analyzing.');
      return;
    }
    try {
      const result = await call('/api/text', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ text }),
      });
      textSuggestion = result.suggestion;
      show('text-result', 'success', 'Detected Text Emotion: <b>' + escape(capitalize(result.label)) + '</b>');
      document.getElementById('suggest-text').style.display = '';
    } catch (e) {
      show('text-result', 'error', escape(e.message));
    }
  };
  document.getElementById('suggest-text').onclick = () => {
    if (textSuggestion) show('text-suggestion', 'info', escape(textSuggestion));
  };

  async function analyzeFace(blob, name) {
    const form = new FormData();
    form.append('image', blob, name);
    hide('face-suggestion');
    try {
      const result = await call('/api/face', { method: 'POST', body: form });
      if (result.status === 'no_face') {
        show('face-result', 'warning', escape(result.message));
      } else {
        show('face-result', 'success', 'Detected Face Emotion: <b>' + escape(result.label) + '</b>');
        show('face-suggestion', 'info', escape(result.suggestion));
      }
    } catch (e) {
      show('face-result', 'error', escape(e.message));
    }
  }

  document.getElementById('start-camera').onclick = async () => {
    try {
      const stream = await navigator.mediaDevices.getUserMedia({ video: true });
      document.getElementById('camera').srcObject = stream;
      document.getElementById('capture').disabled = false;
    } catch (e) {
      show('face-result', 'error', 'Camera unavailable: ' + escape(e.message));
    }
  };
  document.getElementById('capture').onclick = () => {
    const video = document.getElementById('camera');
    const canvas = document.getElementById('snapshot');
    canvas.width = video.videoWidth || 320;
    canvas.height = video.videoHeight || 240;
    canvas.getContext('2d').drawImage(video, 0, 0, canvas.width, canvas.height);
    canvas.toBlob((blob) => analyzeFace(blob, 'capture.png'), 'image/png');
  };
  document.getElementById('face-file').onchange = (event) => {
    const file = event.target.files[0];
    if (file) analyzeFace(file, file.name);
  };

  document.getElementById('voice-file').onchange = async (event) => {
    const file = event.target.files[0];
    hide('voice-suggestion');
    if (!file) {
      show('voice-result', 'info', 'Please upload a WAV or MP3 audio file to analyze.');
      return;
    }
    const form = new FormData();
    form.append('audio', file, file.name);
    show('voice-result', 'info', 'Analyzing...');
    try {
      const result = await call('/api/voice', { method: 'POST', body: form });
      show('voice-result', 'success', 'Detected Voice Emotion: <b>' + escape(capitalize(result.label)) + '</b>');
      show('voice-suggestion', 'info', escape(result.suggestion));
    } catch (e) {
      show('voice-result', 'error', escape(e.message));
    }
  };
</script>
</body>
</html>
"#;
