//! Image reference parsing helpers used by the runtime metadata resolver.

/// Split a raw image reference into `(repo, tag, digest)` using the domain
/// rule that a path segment containing `.`, `:`, or equal to `localhost` is
/// a registry host rather than the start of the repository path (§4.D.4).
pub fn split_image_reference(image: &str) -> (String, String, String) {
    let (before_digest, digest) = match image.split_once('@') {
        Some((before, digest)) => (before.to_string(), digest.to_string()),
        None => (image.to_string(), String::new()),
    };

    let parts: Vec<&str> = before_digest.splitn(2, '/').collect();
    let (host, repo_path) = if parts.len() == 2 && is_registry_host(parts[0]) {
        (Some(parts[0]), parts[1])
    } else {
        (None, before_digest.as_str())
    };

    let (repo, tag) = match repo_path.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
        _ => (repo_path.to_string(), String::new()),
    };

    let repo = match host {
        Some(host) => format!("{}/{}", host, repo),
        None => repo,
    };

    (repo, tag, digest)
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

/// Count the number of CPUs named by a cgroup-style cpuset spec
/// (`"0-2,5"` -> 4). Any parse failure, including an out-of-order range,
/// yields 0 per §4.D.11.
pub fn count_cpuset(spec: &str) -> u32 {
    let spec = spec.trim();
    if spec.is_empty() {
        return 0;
    }

    let mut count: u32 = 0;
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return 0;
        }
        match part.split_once('-') {
            Some((a, b)) => match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
                (Ok(a), Ok(b)) if b >= a => count += b - a + 1,
                _ => return 0,
            },
            None => match part.parse::<u32>() {
                Ok(_) => count += 1,
                Err(_) => return 0,
            },
        }
    }
    count
}

/// Strip matched leading-and-trailing quote pairs, repeatedly, until the
/// outermost characters no longer match. A lone leading quote with no
/// matching trailing quote is left untouched.
pub fn normalize_arg(arg: &str) -> String {
    let mut current = arg.to_string();
    loop {
        let bytes = current.as_bytes();
        if bytes.len() < 2 {
            break;
        }
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        let matched_quote = (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'');
        if !matched_quote {
            break;
        }
        current = current[1..current.len() - 1].to_string();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plain_repo_tag() {
        assert_eq!(
            split_image_reference("nginx:1.25"),
            ("nginx".to_string(), "1.25".to_string(), "".to_string())
        );
    }

    #[test]
    fn split_with_registry_host() {
        assert_eq!(
            split_image_reference("registry.example.com:5000/team/app:v2"),
            (
                "registry.example.com:5000/team/app".to_string(),
                "v2".to_string(),
                "".to_string()
            )
        );
    }

    #[test]
    fn split_with_digest() {
        let (repo, tag, digest) = split_image_reference("nginx@sha256:abcd");
        assert_eq!(repo, "nginx");
        assert_eq!(tag, "");
        assert_eq!(digest, "sha256:abcd");
    }

    #[test]
    fn bare_localhost_is_treated_as_host() {
        let (repo, tag, _) = split_image_reference("localhost/app:dev");
        assert_eq!(repo, "localhost/app");
        assert_eq!(tag, "dev");
    }

    #[test]
    fn plain_library_path_has_no_host() {
        let (repo, tag, _) = split_image_reference("library/nginx:latest");
        assert_eq!(repo, "library/nginx");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn cpuset_range_and_singleton() {
        assert_eq!(count_cpuset("0-2,5"), 4);
        assert_eq!(count_cpuset(""), 0);
        assert_eq!(count_cpuset("0,1,2"), 3);
        assert_eq!(count_cpuset("bogus"), 0);
        assert_eq!(count_cpuset("3-1"), 0);
    }

    #[test]
    fn normalize_arg_strips_matched_quote_pairs() {
        assert_eq!(normalize_arg("\"'foo'\""), "foo");
        assert_eq!(normalize_arg("plain"), "plain");
        assert_eq!(normalize_arg("\"mismatched'"), "\"mismatched'");
    }

    #[test]
    fn normalize_arg_is_idempotent() {
        let once = normalize_arg("\"'foo'\"");
        assert_eq!(normalize_arg(&once), once);
    }
}
