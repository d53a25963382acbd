//! Embedded control page served at `/`.
//!
//! A single self-contained HTML document: snapshot/stream mode toggle,
//! a quality slider, and tap-to-click forwarding to `/click` with
//! coordinates normalized against the rendered image box.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>screenlink</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: Arial, sans-serif;
            background: #1a1a1a;
            color: white;
            padding: 20px;
        }
        .container { max-width: 100%; }
        h1 { text-align: center; margin-bottom: 20px; color: #4CAF50; }
        .control-panel {
            background: #2d2d2d;
            padding: 15px;
            border-radius: 10px;
            margin-bottom: 20px;
            display: flex;
            flex-wrap: wrap;
            gap: 10px;
            justify-content: center;
        }
        button {
            padding: 10px 20px;
            background: #4CAF50;
            color: white;
            border: none;
            border-radius: 5px;
            cursor: pointer;
            font-size: 16px;
        }
        button:active { transform: scale(0.98); }
        .mode-btn { flex: 1; background: #555; }
        .mode-btn.active { background: #4CAF50; }
        .mode-selector { display: flex; gap: 10px; margin-bottom: 15px; width: 100%; }
        .quality-control { display: flex; align-items: center; gap: 10px; width: 100%; }
        input[type="range"] { flex: 1; }
        .screen-container {
            background: #000;
            border-radius: 10px;
            overflow: hidden;
            margin-top: 20px;
            text-align: center;
        }
        #screen { max-width: 100%; border-radius: 5px; cursor: pointer; }
        .info {
            background: #2d2d2d;
            padding: 10px;
            border-radius: 5px;
            margin-top: 10px;
            font-size: 14px;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>screenlink</h1>
        <div class="control-panel">
            <div class="mode-selector">
                <button class="mode-btn active" onclick="setMode('stream', event)">Live stream</button>
                <button class="mode-btn" onclick="setMode('screenshot', event)">Snapshot</button>
            </div>
            <button onclick="updateScreen()">Capture</button>
            <button onclick="toggleStream()" id="stream-btn">Start stream</button>
            <button onclick="fullScreen()">Fullscreen</button>
            <div class="quality-control">
                <label>Quality:</label>
                <input type="range" id="quality" min="10" max="100" value="70" onchange="updateQuality()">
                <span id="quality-value">70%</span>
            </div>
        </div>
        <div class="screen-container">
            <img id="screen" src="" onclick="toggleFullscreen()" alt="the remote screen appears here">
        </div>
        <div class="info">
            <p>Tap the image to click the remote desktop at that spot.</p>
            <p>Served by <span id="ip-address">...</span> &mdash; latency <span id="latency">-</span> ms</p>
        </div>
    </div>

    <script>
        let currentMode = 'stream';
        let streamInterval = null;
        let isStreaming = false;
        let quality = 70;

        fetch('/get_ip')
            .then(r => r.json())
            .then(data => {
                document.getElementById('ip-address').textContent = data.ip + ':' + data.port;
            });

        function setMode(mode, ev) {
            currentMode = mode;
            document.querySelectorAll('.mode-btn').forEach(btn => btn.classList.remove('active'));
            ev.target.classList.add('active');
            if (mode === 'screenshot' && isStreaming) toggleStream();
            if (mode === 'stream' && !isStreaming) toggleStream();
        }

        function toggleStream() {
            if (isStreaming) {
                clearInterval(streamInterval);
                document.getElementById('stream-btn').textContent = 'Start stream';
                isStreaming = false;
            } else {
                document.getElementById('stream-btn').textContent = 'Stop stream';
                isStreaming = true;
                updateScreen();
                streamInterval = setInterval(updateScreen, 100);
            }
        }

        function updateScreen() {
            const startTime = Date.now();
            const img = document.getElementById('screen');
            fetch(`/screen?mode=${currentMode}&q=${quality}&t=${Date.now()}`)
                .then(response => response.blob())
                .then(blob => {
                    img.src = URL.createObjectURL(blob);
                    document.getElementById('latency').textContent = Date.now() - startTime;
                })
                .catch(error => console.error('update failed:', error));
        }

        function updateQuality() {
            quality = document.getElementById('quality').value;
            document.getElementById('quality-value').textContent = quality + '%';
        }

        function fullScreen() {
            const elem = document.getElementById('screen');
            if (elem.requestFullscreen) elem.requestFullscreen();
            else if (elem.webkitRequestFullscreen) elem.webkitRequestFullscreen();
        }

        function toggleFullscreen() {
            if (!document.fullscreenElement) fullScreen();
            else if (document.exitFullscreen) document.exitFullscreen();
        }

        const screenImg = document.getElementById('screen');
        screenImg.addEventListener('touchend', function(e) {
            const touch = e.changedTouches[0];
            const rect = screenImg.getBoundingClientRect();
            const x = (touch.clientX - rect.left) / rect.width;
            const y = (touch.clientY - rect.top) / rect.height;
            fetch('/click', {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify({x: x, y: y})
            });
        });

        document.addEventListener('keydown', function(e) {
            if (e.key === ' ') updateScreen();
            else if (e.key === 's') toggleStream();
            else if (e.key === 'f') fullScreen();
        });

        updateScreen();
    </script>
</body>
</html>
"#;
