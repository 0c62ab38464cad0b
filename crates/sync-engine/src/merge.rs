//! Field-level merge of fetched records against prior local state
//!
//! Users hand-edit display text more often than the index's metadata is
//! wrong, so locally-stored values win for the user-editable fields. The
//! one exception: when the incoming record is a genuine multi-author split
//! that the stored single-author string does not reflect, the incoming
//! author value wins so the splitter can take effect. That boundary is
//! deliberate and is implemented exactly as stated, not "improved".

use crate::splitter::split_author_names;
use audioshelf_core::Track;

/// Merges an incoming record with the existing local row for the same id
///
/// Technical fields (path, locator, duration, audio properties, modified
/// timestamp) always take the incoming value; user-editable fields keep
/// the local one.
pub fn merge_track(mut incoming: Track, local: &Track, delimiters: &[String]) -> Track {
    // User-editable display fields
    if !local.title.trim().is_empty() {
        incoming.title = local.title.clone();
    }
    if !local.book_name.trim().is_empty() {
        incoming.book_name = local.book_name.clone();
    }
    if local.annotation.is_some() {
        incoming.annotation = local.annotation.clone();
    }
    if local.track_number.is_some() {
        incoming.track_number = local.track_number;
    }
    if local.cover_uri.is_some() {
        incoming.cover_uri = local.cover_uri.clone();
    }
    incoming.favorite = local.favorite;

    // Genre comes from the index's secondary lookup; keep the local value
    // when the incoming record has none
    if incoming.genre.is_none() {
        incoming.genre = local.genre.clone();
    }

    if !author_split_overrides(&incoming, local, delimiters) {
        incoming.author_name = local.author_name.clone();
        incoming.author_id = local.author_id;
    }

    incoming
}

/// True when the incoming combined author string splits into more than one
/// name while the stored local value splits into at most one
///
/// With no delimiters configured this never fires.
fn author_split_overrides(incoming: &Track, local: &Track, delimiters: &[String]) -> bool {
    if delimiters.is_empty() {
        return false;
    }
    let incoming_names = split_author_names(&incoming.author_name, delimiters);
    if incoming_names.len() <= 1 {
        return false;
    }
    split_author_names(&local.author_name, delimiters).len() <= 1
}
