use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::idea_store::IdeaRecord;

pub fn build_main_ui_html(initial_ideas: &[IdeaRecord]) -> String {
    MAIN_UI_HTML.replace("__IDEA_FEED__", &render_idea_cards(initial_ideas))
}

fn render_idea_cards(ideas: &[IdeaRecord]) -> String {
    if ideas.is_empty() {
        return "<p class=\"empty\">No ideas yet. The first one pops up when the timer runs out.</p>"
            .to_string();
    }

    let mut cards = Vec::new();
    for idea in ideas {
        cards.push(format!(
            "<article class=\"idea\" data-idea-id=\"{}\"><header class=\"idea-header\"><span class=\"tags\">{}</span><span class=\"piece\">{}</span><time class=\"timestamp\" datetime=\"{}\">{}</time></header><p class=\"idea-text\">{}</p></article>",
            encode_double_quoted_attribute(&idea.id),
            encode_text(&idea.tags),
            encode_text(&idea.missing_piece),
            encode_double_quoted_attribute(&idea.timestamp),
            encode_text(&idea.timestamp),
            encode_text(&idea.text),
        ));
    }
    cards.join("\n")
}

const MAIN_UI_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>IdeaForge</title>
  <style>
    :root {
      --bg: #f6f7f9;
      --panel: #ffffff;
      --line: #d9dde3;
      --text: #1d2127;
      --muted: #6b7280;
      --accent: #4f46e5;
      --accent-soft: #e0e7ff;
      --bar-bg: #e5e7eb;
    }
    body.dark {
      --bg: #1f2024;
      --panel: #1b1c20;
      --line: #3f4248;
      --text: #f3f5f7;
      --muted: #9ca2ad;
      --accent: #818cf8;
      --accent-soft: #312e81;
      --bar-bg: #2a2d33;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      color: var(--text);
      background: var(--bg);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      font-size: 15px;
    }
    .wrap {
      max-width: 960px;
      margin: 0 auto;
      padding: 16px;
    }
    .top {
      display: flex;
      align-items: center;
      justify-content: space-between;
      margin-bottom: 12px;
    }
    h1 {
      margin: 0;
      font-size: 22px;
    }
    .btn {
      border: 1px solid var(--line);
      background: var(--panel);
      color: var(--text);
      border-radius: 6px;
      padding: 6px 12px;
      cursor: pointer;
    }
    .btn:disabled { opacity: 0.5; cursor: default; }
    .panel {
      border: 1px solid var(--line);
      background: var(--panel);
      border-radius: 8px;
      padding: 12px 14px;
      margin-bottom: 12px;
    }
    .phases {
      display: grid;
      grid-template-columns: repeat(3, 1fr);
      gap: 10px;
    }
    .phase {
      border: 1px solid var(--line);
      border-radius: 8px;
      padding: 10px;
      min-height: 84px;
    }
    .phase.active {
      border-color: var(--accent);
      background: var(--accent-soft);
    }
    .phase h2 {
      margin: 0 0 6px;
      font-size: 13px;
      color: var(--muted);
      text-transform: uppercase;
      letter-spacing: 0.04em;
    }
    .phase .value {
      font-size: 17px;
      font-weight: 600;
    }
    .phase .value.hidden { color: var(--muted); font-weight: 400; }
    .timer-row {
      display: flex;
      align-items: baseline;
      justify-content: space-between;
      margin-bottom: 6px;
    }
    .countdown {
      font-size: 28px;
      font-weight: 700;
      font-variant-numeric: tabular-nums;
    }
    .label { color: var(--muted); }
    .bar {
      height: 8px;
      background: var(--bar-bg);
      border-radius: 4px;
      overflow: hidden;
    }
    .bar > div {
      height: 100%;
      width: 0;
      background: var(--accent);
      transition: width 0.9s linear;
    }
    .actions {
      display: flex;
      gap: 8px;
      align-items: center;
      margin-top: 10px;
    }
    .status { color: var(--muted); font-size: 13px; }
    .feed { display: flex; flex-direction: column; gap: 10px; }
    .idea {
      border: 1px solid var(--line);
      background: var(--panel);
      border-radius: 8px;
      padding: 10px 14px;
    }
    .idea-header {
      display: flex;
      gap: 10px;
      flex-wrap: wrap;
      font-size: 12px;
      color: var(--muted);
      margin-bottom: 6px;
    }
    .idea-header .tags { color: var(--accent); font-weight: 600; }
    .idea-header .timestamp { margin-left: auto; }
    .idea-text { margin: 0; line-height: 1.5; }
    .empty { color: var(--muted); }
  </style>
</head>
<body>
  <main class="wrap">
    <div class="top">
      <h1>IdeaForge</h1>
      <button id="theme" class="btn" type="button">Dark mode</button>
    </div>

    <section class="panel">
      <div class="phases">
        <div class="phase" id="phase0">
          <h2>Domain</h2>
          <div class="value hidden" id="domain">Looking...</div>
        </div>
        <div class="phase" id="phase1">
          <h2>Subdomain</h2>
          <div class="value hidden" id="subdomain">Waiting...</div>
        </div>
        <div class="phase" id="phase2">
          <h2>Missing piece</h2>
          <div class="value hidden" id="piece">Waiting...</div>
        </div>
      </div>
    </section>

    <section class="panel" id="timerPanel">
      <div class="timer-row">
        <span class="countdown" id="countdown">60</span>
        <span class="label" id="progressLabel">Looking for domain...</span>
      </div>
      <div class="bar"><div id="progress"></div></div>
      <div class="actions">
        <button id="generate" class="btn" type="button">Generate now</button>
        <span class="status" id="status"></span>
      </div>
    </section>

    <section class="feed" id="feed">
__IDEA_FEED__
    </section>
  </main>

  <script>
    let ideasRevision = null;
    let feedBusy = false;

    function setStatus(message) {
      document.getElementById("status").textContent = message || "";
    }

    async function apiGet(path) {
      const res = await fetch(path, { method: "GET" });
      const data = await res.json();
      if (!res.ok || !data.success) {
        throw new Error(data.error || "request failed");
      }
      return data;
    }

    async function apiPost(path, body) {
      const res = await fetch(path, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(body || {}),
      });
      const data = await res.json();
      if (!res.ok || !data.success) {
        throw new Error(data.error || "request failed");
      }
      return data;
    }

    function setPhaseValue(id, value, placeholder) {
      const el = document.getElementById(id);
      if (value) {
        el.textContent = value;
        el.classList.remove("hidden");
      } else {
        el.textContent = placeholder;
        el.classList.add("hidden");
      }
    }

    function renderTimer(timer) {
      const panel = document.getElementById("timerPanel");
      if (!timer.enabled) {
        panel.querySelector(".timer-row").style.display = "none";
        panel.querySelector(".bar").style.display = "none";
        return;
      }
      document.getElementById("countdown").textContent = timer.secondsRemaining;
      document.getElementById("progressLabel").textContent = timer.progressLabel;
      document.getElementById("progress").style.width = `${timer.isWaiting ? 100 : timer.progressPercent}%`;
      for (let i = 0; i < 3; i += 1) {
        document.getElementById(`phase${i}`).classList.toggle("active", i === timer.phaseIndex);
      }
      setPhaseValue("domain", timer.domain, "Looking...");
      setPhaseValue("subdomain", timer.subdomain, "Waiting...");
      setPhaseValue("piece", timer.missingPiece, "Waiting...");
    }

    function renderIdeas(ideas) {
      const feed = document.getElementById("feed");
      feed.innerHTML = "";
      if (!ideas.length) {
        const empty = document.createElement("p");
        empty.className = "empty";
        empty.textContent = "No ideas yet. The first one pops up when the timer runs out.";
        feed.appendChild(empty);
        return;
      }
      for (const idea of ideas) {
        const card = document.createElement("article");
        card.className = "idea";
        card.dataset.ideaId = idea.id;

        const header = document.createElement("header");
        header.className = "idea-header";
        const tags = document.createElement("span");
        tags.className = "tags";
        tags.textContent = idea.tags;
        const piece = document.createElement("span");
        piece.className = "piece";
        piece.textContent = idea.missingPiece;
        const time = document.createElement("time");
        time.className = "timestamp";
        time.dateTime = idea.timestamp;
        time.textContent = new Date(idea.timestamp).toLocaleString();
        header.append(tags, piece, time);

        const text = document.createElement("p");
        text.className = "idea-text";
        text.textContent = idea.text;

        card.append(header, text);
        feed.appendChild(card);
      }
    }

    async function refreshIdeas() {
      if (feedBusy) {
        return;
      }
      feedBusy = true;
      try {
        const data = await apiGet("/ideas");
        renderIdeas(data.ideas || []);
      } catch (err) {
        setStatus(`Failed to load ideas: ${err.message}`);
      } finally {
        feedBusy = false;
      }
    }

    async function pollTimer() {
      try {
        const data = await apiGet("/timer");
        renderTimer(data.timer);
      } catch (_) {
      }
    }

    async function pollRevision() {
      try {
        const data = await apiGet("/ideas/revision");
        if (ideasRevision !== null && data.revision !== ideasRevision) {
          await refreshIdeas();
        }
        ideasRevision = data.revision;
      } catch (_) {
      }
    }

    document.getElementById("generate").addEventListener("click", async (event) => {
      const button = event.currentTarget;
      button.disabled = true;
      setStatus("Generating...");
      try {
        await apiPost("/ideas/generate", {});
        setStatus("");
        await refreshIdeas();
      } catch (err) {
        setStatus(err.message);
      } finally {
        button.disabled = false;
      }
    });

    function applyTheme(dark) {
      document.body.classList.toggle("dark", dark);
      document.getElementById("theme").textContent = dark ? "Light mode" : "Dark mode";
    }

    document.getElementById("theme").addEventListener("click", () => {
      const dark = !document.body.classList.contains("dark");
      localStorage.setItem("ideaforge-theme", dark ? "dark" : "light");
      applyTheme(dark);
    });

    applyTheme(localStorage.getItem("ideaforge-theme") === "dark");
    for (const el of document.querySelectorAll("time.timestamp")) {
      el.textContent = new Date(el.dateTime).toLocaleString();
    }
    pollTimer();
    pollRevision();
    setInterval(pollTimer, 1000);
    setInterval(pollRevision, 2000);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::build_main_ui_html;
    use crate::idea_store::IdeaRecord;

    #[test]
    fn empty_feed_shows_placeholder() {
        let html = build_main_ui_html(&[]);
        assert!(html.contains("No ideas yet."));
        assert!(!html.contains("__IDEA_FEED__"));
    }

    #[test]
    fn idea_text_is_escaped() {
        let idea = IdeaRecord {
            id: "20260101_000000_000".to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            domain: "CRM".to_string(),
            subdomain: "Lead Management".to_string(),
            missing_piece: "AI-powered".to_string(),
            text: "Scores <script>leads</script> & more".to_string(),
            tags: "(CRM) (Lead Management)".to_string(),
        };
        let html = build_main_ui_html(&[idea]);
        assert!(html.contains("Scores &lt;script&gt;leads&lt;/script&gt; &amp; more"));
        assert!(html.contains("data-idea-id=\"20260101_000000_000\""));
        assert!(html.contains("(CRM) (Lead Management)"));
    }
}
