//! Instrumentation of untrusted HTML before it is mounted in a sandboxed frame.
//!
//! Two independent string transforms:
//! - the capture script reports runtime errors, failed resources, console
//!   output and readiness to the parent window, and answers `getErrors` and
//!   `clear` commands. It must run before any artifact script, so it is
//!   injected as the first child of `<head>`.
//! - the mute script silences every `<audio>`/`<video>` until the first user
//!   gesture.
//!
//! Each script carries a `data-vibecode` marker. A transform first strips any
//! copy of its own script left by an earlier pass, then injects a fresh one, so
//! stored output can be re-instrumented and marker text planted in the
//! document itself never suppresses injection.

use regex::Regex;
use std::sync::LazyLock;

pub const CAPTURE_MARKER: &str = r#"data-vibecode="capture""#;
pub const MUTE_MARKER: &str = r#"data-vibecode="mute""#;

// Tag matchers: case-insensitive, attribute-tolerant, and `<head` must be
// followed by whitespace or `>` so `<header>` never matches.
static HEAD_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").unwrap());
static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());
static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body(\s[^>]*)?>").unwrap());
static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html(\s[^>]*)?>").unwrap());
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<!doctype[^>]*>").unwrap());

const CAPTURE_SCRIPT: &str = r#"<script data-vibecode="capture">
(function () {
  var CHANNEL = 'iframe-debug';
  var errors = [];
  var logs = [];
  var readySent = false;

  function post(payload) {
    try {
      window.parent.postMessage({ channel: CHANNEL, payload: payload }, '*');
    } catch (e) {}
  }

  function record(entry) {
    errors.push(entry);
    post(entry);
  }

  window.onerror = function (message, source, line, column, error) {
    record({
      type: 'error',
      category: error && error.name ? error.name : 'Error',
      message: String(message),
      line: line,
      column: column,
      stack: error && error.stack ? error.stack : null,
      source: source,
      timestamp: Date.now()
    });
    return false;
  };

  window.onunhandledrejection = function (event) {
    var reason = event.reason;
    record({
      type: 'error',
      category: 'UnhandledPromiseRejection',
      message: reason && reason.message ? reason.message : String(reason),
      stack: reason && reason.stack ? reason.stack : null,
      timestamp: Date.now()
    });
  };

  window.addEventListener('error', function (event) {
    var target = event.target;
    if (target && target !== window && target.tagName) {
      record({
        type: 'resource-error',
        category: 'ResourceLoadError',
        message: 'Failed to load: ' + (target.src || target.href || 'unknown'),
        tagName: target.tagName,
        timestamp: Date.now()
      });
    }
  }, true);

  function serialize(arg) {
    try {
      if (arg instanceof Error) {
        return { __error: true, message: arg.message, stack: arg.stack, name: arg.name };
      }
      if (typeof arg === 'object' && arg !== null) {
        return JSON.parse(JSON.stringify(arg));
      }
      if (typeof arg === 'undefined' || typeof arg === 'function' || typeof arg === 'symbol') {
        return String(arg);
      }
      return arg;
    } catch (e) {
      return String(arg);
    }
  }

  function render(arg) {
    if (typeof arg === 'string') return arg;
    if (arg && arg.__error) return arg.message;
    try {
      return JSON.stringify(arg);
    } catch (e) {
      return String(arg);
    }
  }

  ['log', 'warn', 'info', 'error', 'debug'].forEach(function (level) {
    var original = console[level];
    console[level] = function () {
      var args = Array.prototype.slice.call(arguments).map(serialize);
      var entry = { type: 'console', level: level, args: args, timestamp: Date.now() };
      logs.push(entry);
      post(entry);
      if (level === 'error') {
        // Buffered only: the live listener promotes console errors itself.
        errors.push({
          type: 'error',
          category: 'ConsoleError',
          message: args.map(render).join(' '),
          timestamp: entry.timestamp
        });
      }
      if (original) original.apply(console, arguments);
    };
  });

  function ready() {
    if (readySent) return;
    readySent = true;
    post({ type: 'ready', errorsCount: errors.length });
  }
  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', ready);
  } else {
    ready();
  }

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || data.channel !== 'iframe-command') return;
    if (data.command === 'getErrors') {
      post({ type: 'all-errors', errors: errors.slice(), logs: logs.slice() });
    } else if (data.command === 'clear') {
      errors = [];
      logs = [];
    }
  });
})();
</script>"#;

const MUTE_SCRIPT: &str = r#"<script data-vibecode="mute">
(function () {
  var muted = true;
  var GESTURES = ['click', 'touchstart', 'keydown'];

  function eachMedia(fn) {
    var media = document.querySelectorAll('audio, video');
    for (var i = 0; i < media.length; i++) fn(media[i]);
  }

  function muteAll() {
    if (!muted) return;
    eachMedia(function (m) {
      m.muted = true;
      m.volume = 0;
    });
  }

  var observer = new MutationObserver(muteAll);
  observer.observe(document.documentElement, { childList: true, subtree: true });

  function unmute() {
    if (!muted) return;
    muted = false;
    observer.disconnect();
    GESTURES.forEach(function (type) {
      document.removeEventListener(type, unmute, true);
    });
    eachMedia(function (m) {
      m.muted = false;
      m.volume = 1;
    });
  }

  GESTURES.forEach(function (type) {
    document.addEventListener(type, unmute, true);
  });

  muteAll();
  document.addEventListener('DOMContentLoaded', muteAll);
  window.addEventListener('load', muteAll);
})();
</script>"#;

/// Instrument a document for mounting: capture script first, then mute.
pub fn instrument(html: &str) -> String {
    mute_transform(&capture_transform(html))
}

/// Inject the error-capture script as the first child of `<head>`.
pub fn capture_transform(html: &str) -> String {
    let html = html.replace(CAPTURE_SCRIPT, "");
    let html = html.as_str();

    if let Some(m) = HEAD_OPEN.find(html) {
        return splice(html, m.end(), CAPTURE_SCRIPT);
    }

    let synthesized = format!("<head>{}</head>", CAPTURE_SCRIPT);
    if let Some(m) = HTML_OPEN.find(html) {
        return splice(html, m.end(), &synthesized);
    }
    if let Some(m) = DOCTYPE.find(html) {
        return splice(html, m.end(), &synthesized);
    }

    let shell = wrap_fragment(html.trim());
    match HEAD_OPEN.find(&shell) {
        Some(m) => splice(&shell, m.end(), CAPTURE_SCRIPT),
        None => shell,
    }
}

/// Inject the mute script before `</head>`, else after `<body...>`, else at
/// the very start.
pub fn mute_transform(html: &str) -> String {
    let html = html.replace(MUTE_SCRIPT, "");
    let html = html.as_str();

    if let Some(m) = HEAD_CLOSE.find(html) {
        return splice(html, m.start(), MUTE_SCRIPT);
    }
    if let Some(m) = BODY_OPEN.find(html) {
        return splice(html, m.end(), MUTE_SCRIPT);
    }

    format!("{}{}", MUTE_SCRIPT, html)
}

fn splice(html: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    out
}

/// Minimal document around a bare fragment. The capture script goes in after.
fn wrap_fragment(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         </head>\n<body>\n{}\n</body>\n</html>",
        fragment
    )
}
