use std::sync::atomic::{AtomicI64, Ordering};

/// Builds post slugs: the slugified title plus a millisecond stamp that never
/// repeats within this process, even for posts created in the same
/// millisecond.
#[derive(Debug, Default)]
pub struct SlugGenerator {
    last: AtomicI64,
}

impl SlugGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slug_for(&self, title: &str) -> String {
        format!("{}-{}", slugify(title), self.next_stamp())
    }

    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

/// Lowercase ASCII letters and digits, whitespace runs become single hyphens,
/// everything else is dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            '-' if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug.to_string()
    }
}
