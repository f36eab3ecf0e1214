use crate::lang::LanguageProfile;

use std::borrow::Cow;

/// Wraps the submitted source with the profile's boilerplate.
///
/// Sources that already contain the entry point marker are left alone.
pub fn prepare<'a>(profile: &LanguageProfile, raw: &'a str) -> Cow<'a, str> {
    let prefix = profile.boilerplate_prefix.as_deref().unwrap_or("");
    let suffix = profile.boilerplate_suffix.as_deref().unwrap_or("");
    if prefix.is_empty() && suffix.is_empty() {
        return Cow::Borrowed(raw);
    }
    if let Some(ref entry_point) = profile.entry_point {
        if raw.contains(entry_point.as_str()) {
            return Cow::Borrowed(raw);
        }
    }

    let mut s = String::with_capacity(prefix.len() + raw.len() + suffix.len());
    s.push_str(prefix);
    s.push_str(raw);
    s.push_str(suffix);
    Cow::Owned(s)
}
