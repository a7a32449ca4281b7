use percent_encoding::percent_decode_str;

/// Slug used when a path has no usable segment.
const DEFAULT_SLUG: &str = "welcome";

/// Derives the identifying slug for a page path.
///
/// Takes the last non-empty path segment, percent-decoded. Trailing slashes
/// are ignored; an empty or root path maps to `"welcome"`.
#[must_use]
pub fn slug_from_path(path: &str) -> String {
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .find(|s| !s.is_empty());
    match segment {
        Some(seg) => percent_decode_str(seg)
            .decode_utf8()
            .map_or_else(|_| seg.to_owned(), |decoded| decoded.into_owned()),
        None => DEFAULT_SLUG.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_last_segment() {
        assert_eq!(slug_from_path("/pages/about"), "about");
    }

    #[test]
    fn ignores_trailing_slashes() {
        assert_eq!(slug_from_path("/pages/about///"), "about");
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(slug_from_path("/pages/kuis%20umum"), "kuis umum");
    }

    #[test]
    fn root_path_maps_to_welcome() {
        assert_eq!(slug_from_path("/"), "welcome");
        assert_eq!(slug_from_path(""), "welcome");
    }
}
