use std::borrow::Cow;

/// A label value that is safe to export (bounded cardinality).
#[derive(Clone, Debug)]
pub struct BoundedLabel(Cow<'static, str>);

impl BoundedLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct LabelPolicy {
    /// Maximum distinct meeting buckets exported.
    pub max_meeting_buckets: usize,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self { max_meeting_buckets: 50 }
    }
}

impl LabelPolicy {
    /// Buckets a meeting code into a bounded label, so per-meeting drop/rx
    /// counters don't accumulate one label series per live meeting.
    pub fn meeting_bucket(&self, meeting_code: u32) -> BoundedLabel {
        let bucket = (meeting_code as usize) % self.max_meeting_buckets.max(1);
        BoundedLabel(Cow::Owned(format!("m{:02}", bucket)))
    }

    pub fn reason(reason: &'static str) -> BoundedLabel {
        BoundedLabel(Cow::Borrowed(reason))
    }
}
