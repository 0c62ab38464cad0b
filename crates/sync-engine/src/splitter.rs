//! Multi-value author splitting and deduplication
//!
//! Takes the merged track batch and produces the corrected tracks plus the
//! derived author/book entities and junction rows. Surrogate author ids
//! are stable across passes: a carried-forward name-to-id map is consulted
//! first and new names draw from a monotonic counter seeded with the
//! highest id ever assigned.

use audioshelf_core::{Author, AuthorId, Book, BookId, Track, TrackAuthorCrossRef};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Everything the splitter derives from one batch
#[derive(Debug, Default)]
pub struct SplitOutcome {
    pub tracks: Vec<Track>,
    pub books: Vec<Book>,
    pub authors: Vec<Author>,
    pub cross_refs: Vec<TrackAuthorCrossRef>,
}

/// Splits combined author strings, memoizing per distinct raw string
///
/// The same raw value shows up once per track of a book, so the memo
/// avoids re-splitting it for every row.
pub struct AuthorSplitter {
    delimiters: Vec<String>,
    cache: HashMap<String, Vec<String>>,
}

impl AuthorSplitter {
    pub fn new(delimiters: &[String]) -> Self {
        Self {
            delimiters: delimiters
                .iter()
                .filter(|d| !d.is_empty())
                .cloned()
                .collect(),
            cache: HashMap::new(),
        }
    }

    /// Ordered, trimmed, deduplicated author names for a raw string
    pub fn split(&mut self, raw: &str) -> Vec<String> {
        if let Some(hit) = self.cache.get(raw) {
            return hit.clone();
        }
        let names = split_author_names(raw, &self.delimiters);
        self.cache.insert(raw.to_string(), names.clone());
        names
    }
}

/// Splits `raw` on every configured delimiter
///
/// Names that are empty after trimming are dropped. When nothing parsable
/// remains but the raw string itself is non-blank, the raw string is the
/// single author. An empty delimiter list means no splitting.
pub fn split_author_names(raw: &str, delimiters: &[String]) -> Vec<String> {
    let mut parts = vec![raw.to_string()];
    for delimiter in delimiters.iter().filter(|d| !d.is_empty()) {
        parts = parts
            .iter()
            .flat_map(|part| part.split(delimiter.as_str()).map(str::to_string))
            .collect();
    }

    let mut seen = HashSet::new();
    let names: Vec<String> = parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect();

    if names.is_empty() {
        let fallback = raw.trim();
        if fallback.is_empty() {
            Vec::new()
        } else {
            vec![fallback.to_string()]
        }
    } else {
        names
    }
}

/// Runs the full split/dedup/derivation over one merged batch
///
/// `prior_name_to_id` carries the name-to-id assignments of every author
/// already on disk; `max_prior_id` seeds the id counter so new names never
/// collide with ids ever handed out before.
pub fn process(
    mut tracks: Vec<Track>,
    delimiters: &[String],
    group_by_book_author: bool,
    prior_name_to_id: &HashMap<String, AuthorId>,
    max_prior_id: i64,
) -> SplitOutcome {
    let mut splitter = AuthorSplitter::new(delimiters);
    let mut name_to_id = prior_name_to_id.clone();
    let mut next_id = max_prior_id;

    let mut cross_refs = Vec::new();
    let mut book_ids: HashMap<(String, String), BookId> = HashMap::new();
    let mut book_order: Vec<BookId> = Vec::new();
    let mut book_identity: HashMap<BookId, (String, String, AuthorId)> = HashMap::new();

    for track in &mut tracks {
        let names = splitter.split(&track.author_name);

        if let Some(primary) = names.first() {
            track.author_name = primary.clone();
        }
        for (position, name) in names.iter().enumerate() {
            let id = assign_id(&mut name_to_id, &mut next_id, name);
            if position == 0 {
                track.author_id = id;
            }
            cross_refs.push(TrackAuthorCrossRef::new(track.id, id, position == 0));
        }

        // Book identity: title plus the resolved grouping author. The
        // first track's book id observed for a key wins, so pre-existing
        // ids stay stable run over run.
        let group_author = resolve_group_author(track, group_by_book_author);
        let key = (track.book_name.clone(), group_author.clone());
        let book_id = match book_ids.get(&key) {
            Some(id) => *id,
            None => {
                let id = if track.book_id.as_i64() != 0 {
                    track.book_id
                } else {
                    BookId::new(regenerated_book_id(&track.book_name, &group_author))
                };
                book_ids.insert(key, id);
                book_order.push(id);
                let author_id = assign_id(&mut name_to_id, &mut next_id, &group_author);
                book_identity.insert(id, (track.book_name.clone(), group_author, author_id));
                id
            }
        };
        track.book_id = book_id;
    }

    // Aggregates come from the final corrected track set, not the raw
    // identity map, so metadata corrections above are reflected
    let mut books = Vec::with_capacity(book_order.len());
    for book_id in book_order {
        let (title, author_name, author_id) = match book_identity.remove(&book_id) {
            Some(identity) => identity,
            None => continue,
        };
        let mut book = Book::new(book_id, title, author_name, author_id);
        for track in tracks.iter().filter(|t| t.book_id == book_id) {
            book.track_count += 1;
            if book.cover_uri.is_none() {
                book.cover_uri = track.cover_uri.clone();
            }
            if book.year.is_none() {
                book.year = track.year;
            }
        }
        books.push(book);
    }

    let mut author_counts: HashMap<AuthorId, u32> = HashMap::new();
    for xref in &cross_refs {
        *author_counts.entry(xref.author_id).or_insert(0) += 1;
    }
    let id_to_name: HashMap<AuthorId, &String> =
        name_to_id.iter().map(|(name, id)| (*id, name)).collect();
    let mut authors: Vec<Author> = author_counts
        .iter()
        .filter_map(|(id, count)| {
            id_to_name.get(id).map(|name| {
                let mut author = Author::new(*id, (*name).clone());
                author.track_count = *count;
                author
            })
        })
        .collect();
    authors.sort_by_key(|a| a.id);

    SplitOutcome {
        tracks,
        books,
        authors,
        cross_refs,
    }
}

fn resolve_group_author(track: &Track, group_by_book_author: bool) -> String {
    if group_by_book_author {
        if let Some(book_author) = track
            .book_author
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return book_author.to_string();
        }
    }
    track.author_name.clone()
}

fn assign_id(map: &mut HashMap<String, AuthorId>, next_id: &mut i64, name: &str) -> AuthorId {
    if let Some(id) = map.get(name) {
        return *id;
    }
    *next_id += 1;
    let id = AuthorId::new(*next_id);
    map.insert(name.to_string(), id);
    id
}

/// Stable surrogate book id for groups the index supplied no id for
fn regenerated_book_id(title: &str, author: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0x1f]);
    hasher.update(author.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}
