//! Per-series next-up resolution.
//!
//! Resolution has two phases. [`SeriesResolver::rank`] runs one query to
//! find when the user last watched the series, which is all the aggregator
//! needs to sort and filter. [`SeriesResolver::materialize`] runs the more
//! expensive next-episode lookup and is only called for candidates that
//! survive filtering.

use mq_core::{
    Episode, EpisodeOrder, EpisodeQuery, LastWatched, LibraryIndex, ParentIndexFilter,
    PlaybackStore, Result, SeriesKey, UserId,
};
use tracing::debug;

use crate::aired_order::sort_aired;

/// Whether the user is watching a series for the first time or going
/// through it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Offer the first unwatched episode after the last one watched.
    FirstWatch,
    /// Offer the already-watched episode after the most recently played one.
    Rewatch,
}

impl WatchMode {
    fn is_rewatch(self) -> bool {
        matches!(self, Self::Rewatch)
    }
}

/// A ranked series, ready to be filtered and then materialized.
#[derive(Debug, Clone)]
pub struct NextUpCandidate {
    pub series_key: SeriesKey,
    pub last_watched: LastWatched,
    pub mode: WatchMode,
    /// The episode `last_watched` refers to.
    anchor: Option<Episode>,
}

impl NextUpCandidate {
    /// The most recently watched regular episode, if any.
    pub fn anchor(&self) -> Option<&Episode> {
        self.anchor.as_ref()
    }
}

/// Resolves next-up candidates for one user.
pub struct SeriesResolver<'a, L, P> {
    library: &'a L,
    playback: &'a P,
    user_id: UserId,
    specials_within_seasons: bool,
}

impl<'a, L, P> SeriesResolver<'a, L, P>
where
    L: LibraryIndex,
    P: PlaybackStore,
{
    pub fn new(
        library: &'a L,
        playback: &'a P,
        user_id: UserId,
        specials_within_seasons: bool,
    ) -> Self {
        Self {
            library,
            playback,
            user_id,
            specials_within_seasons,
        }
    }

    /// Find the last watched regular episode of `series_key` and when it
    /// was watched.
    pub fn rank(&self, series_key: &SeriesKey, mode: WatchMode) -> Result<NextUpCandidate> {
        let order = match mode {
            WatchMode::FirstWatch => EpisodeOrder::SortKeyDescending,
            WatchMode::Rewatch => EpisodeOrder::DatePlayedDescending,
        };
        let query = EpisodeQuery::for_user(self.user_id)
            .series(series_key)
            .played(true)
            .parent_index(ParentIndexFilter::NotEquals(0))
            .order(order)
            .limit(1);
        let anchor = self.library.query_episodes(&query)?.into_iter().next();

        let last_watched = match &anchor {
            Some(episode) => match self
                .playback
                .watch_mark(self.user_id, episode.id)?
                .last_played_at
            {
                Some(at) => LastWatched::At(at),
                None => LastWatched::WatchedUndated,
            },
            None => LastWatched::NotStarted,
        };

        debug!(series = %series_key, ?mode, ?last_watched, "ranked series");
        Ok(NextUpCandidate {
            series_key: series_key.clone(),
            last_watched,
            mode,
            anchor,
        })
    }

    /// The episode to offer next for `candidate`, or `None` when there is
    /// nothing to offer or the next episode is already in progress.
    pub fn materialize(&self, candidate: &NextUpCandidate) -> Result<Option<Episode>> {
        let rewatching = candidate.mode.is_rewatch();
        let anchor = candidate.anchor();

        // In rewatch mode the anchor is itself played and matches the lower
        // bound, so the episode after it is the second row.
        let skip = usize::from(rewatching);
        let query = EpisodeQuery::for_user(self.user_id)
            .series(&candidate.series_key)
            .played(rewatching)
            .virtual_items(false)
            .parent_index(ParentIndexFilter::NotEquals(0))
            .min_sort_key(anchor.map(|a| a.sort_key.as_str()))
            .order(EpisodeOrder::SortKeyAscending)
            .limit(skip + 1);
        let mut next = self.library.query_episodes(&query)?.into_iter().nth(skip);

        if self.specials_within_seasons {
            next = self.interleave_specials(candidate, anchor, next)?;
        }

        let Some(episode) = next else {
            debug!(series = %candidate.series_key, "no next episode");
            return Ok(None);
        };

        if self
            .playback
            .watch_mark(self.user_id, episode.id)?
            .is_partially_watched()
        {
            debug!(
                series = %candidate.series_key,
                episode = %episode.id,
                "next episode is in progress, leaving it to resume"
            );
            return Ok(None);
        }

        debug!(series = %candidate.series_key, episode = %episode.id, "resolved next episode");
        Ok(Some(episode))
    }

    /// Let a placed special that airs right after the anchor take the place
    /// of the plain next episode.
    fn interleave_specials(
        &self,
        candidate: &NextUpCandidate,
        anchor: Option<&Episode>,
        next: Option<Episode>,
    ) -> Result<Option<Episode>> {
        let query = EpisodeQuery::for_user(self.user_id)
            .series(&candidate.series_key)
            .played(candidate.mode.is_rewatch())
            .virtual_items(false)
            .parent_index(ParentIndexFilter::Equals(0));
        let mut considered: Vec<Episode> = self
            .library
            .query_episodes(&query)?
            .into_iter()
            .filter(Episode::has_season_placement)
            .collect();
        considered.extend(anchor.cloned());
        considered.extend(next);
        sort_aired(&mut considered);

        let mut ordered = considered.into_iter();
        Ok(match anchor {
            Some(anchor) => ordered.skip_while(|e| e.id != anchor.id).nth(1),
            None => ordered.next(),
        })
    }
}
