//! List recipes command.

use recipe_lib::Catalog;
use std::process::ExitCode;

/// Simple glob matching with * and ? wildcards (case-insensitive).
pub fn matches_glob(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                // Let the last star absorb one more char
                Some((sp, st)) => {
                    star = Some((sp, st + 1));
                    p = sp + 1;
                    t = st + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// List catalog recipes with optional filtering.
pub fn cmd_list(catalog: &Catalog, patterns: Vec<String>, latest: bool, json: bool) -> ExitCode {
    let mut rows: Vec<(String, Vec<String>)> = catalog
        .entries()
        .filter(|e| patterns.is_empty() || patterns.iter().any(|pat| matches_glob(pat, &e.name)))
        .map(|e| (e.name.clone(), e.sorted_versions()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    if latest {
        for (_, versions) in &mut rows {
            versions.truncate(1);
        }
    }

    if json {
        let refs: Vec<String> = rows
            .iter()
            .flat_map(|(name, versions)| versions.iter().map(move |v| format!("{}/{}", name, v)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&refs).unwrap_or_default());
    } else if rows.is_empty() {
        println!("No recipes found.");
    } else {
        println!("Available recipes ({}):", rows.len());
        for (name, versions) in rows {
            println!("  {} ({})", name, versions.join(", "));
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matching() {
        assert!(matches_glob("zlib", "zlib"));
        assert!(matches_glob("LIB*", "libcurl"));
        assert!(matches_glob("*curl", "libcurl"));
        assert!(matches_glob("z?ib", "zlib"));
        assert!(matches_glob("*", ""));
        assert!(!matches_glob("zlib", "zlib-ng"));
        assert!(!matches_glob("?", ""));
    }
}
