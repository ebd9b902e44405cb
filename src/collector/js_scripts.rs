//! JavaScript snippets evaluated in the page for the DOM harvest.

/// Collect every `<img>` source. Extension filtering happens on the Rust
/// side where it is testable.
pub const IMAGE_SOURCES_SCRIPT: &str = r"
    (function() {
        return Array.from(document.querySelectorAll('img'))
            .map((img) => img.src)
            .filter((src) => src && src.length > 0);
    })()
";

/// Collect every non-empty `<video>` source.
pub const VIDEO_SOURCES_SCRIPT: &str = r"
    (function() {
        return Array.from(document.querySelectorAll('video'))
            .map((video) => video.src)
            .filter((src) => src && src.length > 0);
    })()
";
