//! URL-friendly slugs for published articles.

/// Fold common accented Latin characters to ASCII.
fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    };
    if folded.is_ascii_alphanumeric() {
        Some(folded)
    } else if folded.is_whitespace() || folded == '-' || folded == '_' {
        Some('-')
    } else {
        None
    }
}

/// Convert text to a URL-friendly slug, at most 100 chars.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in text.to_lowercase().chars() {
        match fold_char(c) {
            Some('-') => {
                if !last_dash {
                    slug.push('-');
                    last_dash = true;
                }
            }
            Some(c) => {
                slug.push(c);
                last_dash = false;
            }
            None => {}
        }
        if slug.len() >= 100 {
            break;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Slug for an article title, falling back to the item id when the title
/// yields nothing usable, with a short-id suffix on collision.
pub fn unique_slug<E>(
    title: &str,
    item_id: &str,
    exists: impl Fn(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let short_id: String = item_id.chars().take(8).collect();
    let mut slug = slugify(title);
    if slug.is_empty() {
        slug = format!("articulo-{}", short_id);
    }
    if exists(&slug)? {
        slug = format!("{}-{}", slug, short_id);
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(
            slugify("Senado aprueba ley de presupuesto 2026"),
            "senado-aprueba-ley-de-presupuesto-2026"
        );
    }

    #[test]
    fn test_slugify_accents_and_punctuation() {
        assert_eq!(
            slugify("¡Economía en alza! ¿Qué pasó?"),
            "economia-en-alza-que-paso"
        );
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "palabra ".repeat(40);
        assert!(slugify(&long).len() <= 100);
    }

    #[test]
    fn test_unique_slug_collision_appends_short_id() {
        let slug = unique_slug("Hola mundo", "deadbeef-1234", |s| {
            Ok::<_, ()>(s == "hola-mundo")
        })
        .unwrap();
        assert_eq!(slug, "hola-mundo-deadbeef");
    }

    #[test]
    fn test_unique_slug_empty_title() {
        let slug = unique_slug("¡¡¡", "cafebabe-5678", |_| Ok::<_, ()>(false)).unwrap();
        assert_eq!(slug, "articulo-cafebabe");
    }
}
