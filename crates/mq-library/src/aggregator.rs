//! The next-up view: one suggested episode per series the user is
//! watching, newest activity first.

use chrono::{DateTime, Utc};
use mq_core::{
    Episode, EpisodeOrder, EpisodeQuery, Error, Item, ItemId, LastWatched, LibraryIndex,
    PlaybackStore, Result, SeriesKey, UserId, UserProfile,
};
use serde::Serialize;
use tracing::debug;

use crate::resolver::{NextUpCandidate, SeriesResolver, WatchMode};

/// Parameters of a next-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUpQuery {
    pub user_id: UserId,
    /// Restrict to one series item.
    pub series_id: Option<ItemId>,
    /// Restrict to series under one folder.
    pub parent_id: Option<ItemId>,
    pub enable_rewatching: bool,
    /// Never suggest the first episode of a series the user has not started.
    pub disable_first_episode: bool,
    /// Series last watched before this are only kept as first-episode
    /// suggestions.
    pub next_up_date_cutoff: Option<DateTime<Utc>>,
    pub start_index: Option<usize>,
    pub limit: Option<usize>,
    pub enable_total_record_count: bool,
}

impl NextUpQuery {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            series_id: None,
            parent_id: None,
            enable_rewatching: false,
            disable_first_episode: false,
            next_up_date_cutoff: None,
            start_index: None,
            limit: None,
            enable_total_record_count: false,
        }
    }

    pub fn series(mut self, series_id: ItemId) -> Self {
        self.series_id = Some(series_id);
        self
    }

    pub fn parent(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn rewatching(mut self, enabled: bool) -> Self {
        self.enable_rewatching = enabled;
        self
    }

    pub fn disable_first_episode(mut self, disabled: bool) -> Self {
        self.disable_first_episode = disabled;
        self
    }

    pub fn cutoff(mut self, cutoff: DateTime<Utc>) -> Self {
        self.next_up_date_cutoff = Some(cutoff);
        self
    }

    pub fn start_index(mut self, start: usize) -> Self {
        self.start_index = Some(start);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_total_count(mut self) -> Self {
        self.enable_total_record_count = true;
        self
    }
}

/// One page of next-up episodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextUpResult {
    pub items: Vec<Episode>,
    /// Size of the whole view, when counting was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_record_count: Option<usize>,
    pub start_index: usize,
}

/// Builds next-up views from a library index and a playback store.
pub struct NextUpService<'a, L, P> {
    library: &'a L,
    playback: &'a P,
    specials_within_seasons: bool,
}

impl<'a, L, P> NextUpService<'a, L, P>
where
    L: LibraryIndex,
    P: PlaybackStore,
{
    pub fn new(library: &'a L, playback: &'a P, specials_within_seasons: bool) -> Self {
        Self {
            library,
            playback,
            specials_within_seasons,
        }
    }

    /// Next-up over the query's parent folder, or over the user's root
    /// folders minus those excluded from latest items.
    pub fn resolve_next_up(&self, query: &NextUpQuery) -> Result<NextUpResult> {
        let user = self.require_user(query.user_id)?;

        if let Some(key) = self.requested_series(query)? {
            return self.single_series(query, &user, key);
        }

        let scope: Vec<Item> = match query.parent_id {
            Some(parent_id) => self.library.get_item(parent_id)?.into_iter().collect(),
            None => self
                .library
                .root_folders(user.id)?
                .into_iter()
                .filter(|folder| !user.latest_item_excludes.contains(&folder.id))
                .collect(),
        };
        self.aggregate(query, &user, &scope)
    }

    /// Next-up over an explicit set of folders.
    pub fn resolve_next_up_in(
        &self,
        query: &NextUpQuery,
        scope_folders: &[Item],
    ) -> Result<NextUpResult> {
        let user = self.require_user(query.user_id)?;

        if let Some(key) = self.requested_series(query)? {
            return self.single_series(query, &user, key);
        }
        self.aggregate(query, &user, scope_folders)
    }

    fn require_user(&self, user_id: UserId) -> Result<UserProfile> {
        self.library
            .get_user(user_id)?
            .ok_or_else(|| Error::invalid_argument(format!("unknown user {user_id}")))
    }

    /// The series key behind `series_id`, when it names a series.
    fn requested_series(&self, query: &NextUpQuery) -> Result<Option<SeriesKey>> {
        let Some(series_id) = query.series_id else {
            return Ok(None);
        };
        let key = self
            .library
            .get_item(series_id)?
            .and_then(|item| item.presentation_key());
        if key.is_none() {
            debug!(%series_id, "series filter does not name a series, using the full view");
        }
        Ok(key)
    }

    fn single_series(
        &self,
        query: &NextUpQuery,
        user: &UserProfile,
        key: SeriesKey,
    ) -> Result<NextUpResult> {
        let episodes = self.next_up_episodes(query, user, &[key])?;
        Ok(paginate(query, episodes))
    }

    fn aggregate(
        &self,
        query: &NextUpQuery,
        user: &UserProfile,
        scope: &[Item],
    ) -> Result<NextUpResult> {
        // An empty scope would read as "no ancestor filter" below.
        if scope.is_empty() {
            return Ok(paginate(query, Vec::new()));
        }

        let representatives = EpisodeQuery::for_user(user.id)
            .within(scope.iter().map(|folder| folder.id).collect())
            .order(EpisodeOrder::DatePlayedDescending)
            .group_by_series();
        let keys: Vec<SeriesKey> = self
            .library
            .query_episodes(&representatives)?
            .into_iter()
            .map(|episode| episode.series_key)
            .filter(|key| !key.is_empty())
            .collect();

        let episodes = self.next_up_episodes(query, user, &keys)?;
        Ok(paginate(query, episodes))
    }

    /// Rank every series, filter, then materialize the survivors in order.
    ///
    /// Without a total count only as many survivors as the page needs are
    /// materialized.
    fn next_up_episodes(
        &self,
        query: &NextUpQuery,
        user: &UserProfile,
        keys: &[SeriesKey],
    ) -> Result<Vec<Episode>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let resolver = SeriesResolver::new(
            self.library,
            self.playback,
            user.id,
            self.specials_within_seasons,
        );

        let mut candidates = keys
            .iter()
            .map(|key| resolver.rank(key, WatchMode::FirstWatch))
            .collect::<Result<Vec<_>>>()?;
        if query.enable_rewatching {
            for key in keys {
                candidates.push(resolver.rank(key, WatchMode::Rewatch)?);
            }
            candidates.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        }

        let mut visibility = Visibility::new(query);
        let survivors: Vec<NextUpCandidate> = candidates
            .into_iter()
            .filter(|candidate| visibility.admit(candidate.last_watched))
            .collect();

        let wanted = match (query.enable_total_record_count, query.limit) {
            (false, Some(limit)) => Some(query.start_index.unwrap_or(0).saturating_add(limit)),
            _ => None,
        };

        let mut episodes = Vec::new();
        for candidate in &survivors {
            if wanted.is_some_and(|n| episodes.len() >= n) {
                break;
            }
            if let Some(episode) = resolver.materialize(candidate)? {
                episodes.push(episode);
            }
        }

        debug!(
            user = %user.id,
            series = keys.len(),
            survivors = survivors.len(),
            episodes = episodes.len(),
            "next-up resolved"
        );
        Ok(episodes)
    }
}

/// Which ranked candidates make it into the view.
///
/// Evaluated left to right over the ranked list: series never started are
/// kept as first-episode suggestions only until a series with qualifying
/// activity has been seen.
struct Visibility {
    disable_first_episode: bool,
    always_enable_first_episode: bool,
    cutoff: Option<DateTime<Utc>>,
    any_found: bool,
}

impl Visibility {
    fn new(query: &NextUpQuery) -> Self {
        Self {
            disable_first_episode: query.disable_first_episode,
            always_enable_first_episode: query.series_id.is_some(),
            cutoff: query.next_up_date_cutoff,
            any_found: false,
        }
    }

    fn admit(&mut self, last_watched: LastWatched) -> bool {
        if self.disable_first_episode {
            return !last_watched.is_not_started();
        }

        let recent = match last_watched {
            LastWatched::NotStarted => false,
            LastWatched::WatchedUndated => self.cutoff.is_none(),
            LastWatched::At(at) => self.cutoff.map_or(true, |cutoff| at >= cutoff),
        };
        if self.always_enable_first_episode || recent {
            self.any_found = true;
            return true;
        }

        !self.any_found && last_watched.is_not_started()
    }
}

fn paginate(query: &NextUpQuery, episodes: Vec<Episode>) -> NextUpResult {
    let start_index = query.start_index.unwrap_or(0);
    let total_record_count = query.enable_total_record_count.then_some(episodes.len());
    let items = episodes
        .into_iter()
        .skip(start_index)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    NextUpResult {
        items,
        total_record_count,
        start_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use chrono::Duration;
    use mq_core::{Collection, ParentIndexFilter};
    use mq_db::SqliteLibrary;
    use std::cell::RefCell;

    fn ids(result: &NextUpResult) -> Vec<ItemId> {
        result.items.iter().map(|e| e.id).collect()
    }

    /// Records which series had their next episode looked up.
    struct CountingLibrary<'a> {
        inner: &'a SqliteLibrary,
        materialized: RefCell<Vec<SeriesKey>>,
    }

    impl<'a> CountingLibrary<'a> {
        fn new(inner: &'a SqliteLibrary) -> Self {
            Self {
                inner,
                materialized: RefCell::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<SeriesKey> {
            self.materialized.take()
        }
    }

    impl LibraryIndex for CountingLibrary<'_> {
        fn query_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>> {
            let next_episode_lookup = query.is_virtual == Some(false)
                && query.parent_index == ParentIndexFilter::NotEquals(0)
                && query.order == EpisodeOrder::SortKeyAscending;
            if next_episode_lookup {
                if let Some(key) = &query.series_key {
                    self.materialized.borrow_mut().push(key.clone());
                }
            }
            self.inner.query_episodes(query)
        }

        fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
            self.inner.get_item(id)
        }

        fn find_item_by_path(&self, path: &str) -> Result<Option<ItemId>> {
            self.inner.find_item_by_path(path)
        }

        fn list_collections(&self, user: UserId) -> Result<Vec<Collection>> {
            self.inner.list_collections(user)
        }

        fn get_user(&self, id: UserId) -> Result<Option<UserProfile>> {
            self.inner.get_user(id)
        }

        fn root_folders(&self, user: UserId) -> Result<Vec<Item>> {
            self.inner.root_folders(user)
        }
    }

    #[test]
    fn unknown_user_is_invalid_argument() {
        let fx = Fixture::new();
        let err = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(UserId::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn library_with_no_series_is_empty() {
        let fx = Fixture::new();
        let result = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(fx.user).with_total_count())
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_record_count, Some(0));
    }

    #[test]
    fn watched_series_offers_next_episode() {
        // E1 unwatched, E2 watched at D, E3 in season 2; cutoff before D.
        let fx = Fixture::new();
        let show = fx.series("S");
        fx.episode(&show, 1, 1);
        let e2 = fx.episode(&show, 1, 2);
        let e3 = fx.episode(&show, 2, 1);
        let d = fx.days_ago(2);
        fx.watched(&e2, d);

        let query = NextUpQuery::new(fx.user).cutoff(d - Duration::days(1));
        let result = fx.service(true).resolve_next_up(&query).unwrap();
        assert_eq!(ids(&result), vec![e3.id]);
    }

    #[test]
    fn most_recently_watched_series_first() {
        let fx = Fixture::new();
        let older = fx.series("Older");
        let o1 = fx.episode(&older, 1, 1);
        let o2 = fx.episode(&older, 1, 2);
        let newer = fx.series("Newer");
        let n1 = fx.episode(&newer, 1, 1);
        let n2 = fx.episode(&newer, 1, 2);
        fx.watched(&o1, fx.days_ago(5));
        fx.watched(&n1, fx.days_ago(1));

        let result = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(fx.user))
            .unwrap();
        assert_eq!(ids(&result), vec![n2.id, o2.id]);
    }

    #[test]
    fn unstarted_series_kept_only_before_first_active_one() {
        let fx = Fixture::new();
        let active = fx.series("Active");
        let a1 = fx.episode(&active, 1, 1);
        let a2 = fx.episode(&active, 1, 2);
        let fresh = fx.series("Fresh");
        fx.episode(&fresh, 1, 1);
        fx.watched(&a1, fx.days_ago(1));

        // The unstarted series sorts after the active one and is dropped.
        let result = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(fx.user))
            .unwrap();
        assert_eq!(ids(&result), vec![a2.id]);
    }

    #[test]
    fn unstarted_series_alone_is_suggested() {
        let fx = Fixture::new();
        let fresh = fx.series("Fresh");
        let f1 = fx.episode(&fresh, 1, 1);
        fx.episode(&fresh, 1, 2);

        let service = fx.service(true);
        let result = service.resolve_next_up(&NextUpQuery::new(fx.user)).unwrap();
        assert_eq!(ids(&result), vec![f1.id]);

        let query = NextUpQuery::new(fx.user).disable_first_episode(true);
        assert!(service.resolve_next_up(&query).unwrap().items.is_empty());
    }

    #[test]
    fn unstarted_series_ranked_first_is_kept_alongside_active_one() {
        // A played special ranks the series first without starting it.
        let fx = Fixture::new();
        let sampled = fx.series("Sampled");
        let s1 = fx.episode(&sampled, 1, 1);
        let special = fx.special(&sampled, 1, |s| s.airs_before(1, None));
        fx.watched(&special, fx.days_ago(1));
        let active = fx.series("Active");
        let a1 = fx.episode(&active, 1, 1);
        let a2 = fx.episode(&active, 1, 2);
        fx.watched(&a1, fx.days_ago(3));

        let result = fx
            .service(false)
            .resolve_next_up(&NextUpQuery::new(fx.user))
            .unwrap();
        assert_eq!(ids(&result), vec![s1.id, a2.id]);
    }

    #[test]
    fn series_before_cutoff_is_dropped() {
        let fx = Fixture::new();
        let stale = fx.series("Stale");
        let s1 = fx.episode(&stale, 1, 1);
        fx.episode(&stale, 1, 2);
        fx.watched(&s1, fx.days_ago(40));

        let query = NextUpQuery::new(fx.user).cutoff(fx.days_ago(30));
        let result = fx.service(true).resolve_next_up(&query).unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn undated_watch_needs_no_cutoff() {
        let fx = Fixture::new();
        let show = fx.series("Imported");
        let e1 = fx.episode(&show, 1, 1);
        let e2 = fx.episode(&show, 1, 2);
        fx.watched_undated(&e1);

        let service = fx.service(true);
        let result = service.resolve_next_up(&NextUpQuery::new(fx.user)).unwrap();
        assert_eq!(ids(&result), vec![e2.id]);

        let query = NextUpQuery::new(fx.user).cutoff(fx.days_ago(30));
        assert!(service.resolve_next_up(&query).unwrap().items.is_empty());
    }

    #[test]
    fn single_series_always_offers_first_episode() {
        let fx = Fixture::new();
        let stale = fx.series("Stale");
        let s1 = fx.episode(&stale, 1, 1);
        let s2 = fx.episode(&stale, 1, 2);
        fx.watched(&s1, fx.days_ago(40));
        let other = fx.series("Other");
        let o1 = fx.episode(&other, 1, 1);
        fx.episode(&other, 1, 2);
        fx.watched(&o1, fx.days_ago(1));

        let query = NextUpQuery::new(fx.user)
            .series(stale.item.id)
            .cutoff(fx.days_ago(30));
        let result = fx.service(true).resolve_next_up(&query).unwrap();
        assert_eq!(ids(&result), vec![s2.id]);
    }

    #[test]
    fn non_series_filter_gives_full_view_with_first_episodes() {
        let fx = Fixture::new();
        let active = fx.series("Active");
        let a1 = fx.episode(&active, 1, 1);
        let a2 = fx.episode(&active, 1, 2);
        fx.watched(&a1, fx.days_ago(1));
        let stale = fx.series("Stale");
        let s1 = fx.episode(&stale, 1, 1);
        let s2 = fx.episode(&stale, 1, 2);
        fx.watched(&s1, fx.days_ago(40));
        let fresh = fx.series("Fresh");
        let f1 = fx.episode(&fresh, 1, 1);
        let movie = fx.movie("Heat", None);

        let service = fx.service(true);
        let plain = NextUpQuery::new(fx.user).cutoff(fx.days_ago(30));
        assert_eq!(ids(&service.resolve_next_up(&plain).unwrap()), vec![a2.id]);

        let query = plain.series(movie.id);
        let result = service.resolve_next_up(&query).unwrap();
        assert_eq!(ids(&result), vec![a2.id, s2.id, f1.id]);
    }

    #[test]
    fn parent_scope_limits_series() {
        let fx = Fixture::new();
        let anime = fx.root_folder("Anime");
        let inside = fx.series_in("Inside", anime.id);
        let i1 = fx.episode(&inside, 1, 1);
        let i2 = fx.episode(&inside, 1, 2);
        let outside = fx.series("Outside");
        let x1 = fx.episode(&outside, 1, 1);
        fx.episode(&outside, 1, 2);
        fx.watched(&i1, fx.days_ago(2));
        fx.watched(&x1, fx.days_ago(1));

        let service = fx.service(true);
        let query = NextUpQuery::new(fx.user).parent(anime.id);
        assert_eq!(ids(&service.resolve_next_up(&query).unwrap()), vec![i2.id]);

        let result = service
            .resolve_next_up_in(&NextUpQuery::new(fx.user), &[anime])
            .unwrap();
        assert_eq!(ids(&result), vec![i2.id]);

        let unknown = NextUpQuery::new(fx.user).parent(ItemId::new());
        assert!(service.resolve_next_up(&unknown).unwrap().items.is_empty());
    }

    #[test]
    fn excluded_root_folders_are_skipped() {
        let fx = Fixture::new();
        let kids = fx.root_folder("Kids");
        let cartoon = fx.series_in("Cartoon", kids.id);
        let c1 = fx.episode(&cartoon, 1, 1);
        fx.episode(&cartoon, 1, 2);
        fx.watched(&c1, fx.days_ago(1));
        fx.exclude_from_latest(kids.id);

        let result = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(fx.user))
            .unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn finished_series_drop_out() {
        let fx = Fixture::new();
        let done = fx.series("Done");
        let d1 = fx.episode(&done, 1, 1);
        fx.watched(&d1, fx.days_ago(1));

        let result = fx
            .service(true)
            .resolve_next_up(&NextUpQuery::new(fx.user).with_total_count())
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_record_count, Some(0));
    }

    #[test]
    fn pagination_window_and_total_count() {
        let fx = Fixture::new();
        let mut expected = Vec::new();
        for i in 0..5 {
            let show = fx.series(&format!("Show {i}"));
            let e1 = fx.episode(&show, 1, 1);
            expected.push(fx.episode(&show, 1, 2).id);
            fx.watched(&e1, fx.days_ago(10 - i));
        }
        expected.reverse();

        let service = fx.service(true);
        for (start, limit) in [(0, 2), (2, 2), (4, 2), (5, 2), (7, 3), (1, 10)] {
            let query = NextUpQuery::new(fx.user)
                .start_index(start)
                .limit(limit)
                .with_total_count();
            let result = service.resolve_next_up(&query).unwrap();
            let want: Vec<ItemId> = expected.iter().skip(start).take(limit).copied().collect();
            assert_eq!(ids(&result), want, "start={start} limit={limit}");
            assert_eq!(result.total_record_count, Some(5));
            assert_eq!(result.start_index, start);
        }

        // Without counting the page comes out the same.
        let query = NextUpQuery::new(fx.user).start_index(1).limit(2);
        let result = service.resolve_next_up(&query).unwrap();
        assert_eq!(ids(&result), expected[1..3].to_vec());
        assert_eq!(result.total_record_count, None);
    }

    #[test]
    fn only_survivors_up_to_the_page_are_materialized() {
        let fx = Fixture::new();
        let mut keys = Vec::new();
        for (name, days) in [("A", 1), ("B", 2), ("C", 3)] {
            let show = fx.series(name);
            let e1 = fx.episode(&show, 1, 1);
            fx.episode(&show, 1, 2);
            fx.watched(&e1, fx.days_ago(days));
            keys.push(show.key);
        }
        let stale = fx.series("Stale");
        let s1 = fx.episode(&stale, 1, 1);
        fx.episode(&stale, 1, 2);
        fx.watched(&s1, fx.days_ago(40));
        let fresh = fx.series("Fresh");
        fx.episode(&fresh, 1, 1);

        let counting = CountingLibrary::new(&fx.library);
        let service = NextUpService::new(&counting, &fx.library, true);
        let query = NextUpQuery::new(fx.user)
            .cutoff(fx.days_ago(30))
            .start_index(1)
            .limit(1);

        let result = service.resolve_next_up(&query).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(counting.take(), keys[..2].to_vec());

        let result = service.resolve_next_up(&query.with_total_count()).unwrap();
        assert_eq!(result.total_record_count, Some(3));
        assert_eq!(counting.take(), keys);
    }

    #[test]
    fn rewatch_adds_rewatch_suggestions() {
        let fx = Fixture::new();
        let show = fx.series("Comfort");
        let e1 = fx.episode(&show, 1, 1);
        let e2 = fx.episode(&show, 1, 2);
        let e3 = fx.episode(&show, 1, 3);
        let base = fx.days_ago(20);
        fx.watched(&e1, base);
        fx.watched(&e2, base + Duration::days(1));
        fx.watched(&e1, base + Duration::days(10));

        let service = fx.service(true);
        let plain = service.resolve_next_up(&NextUpQuery::new(fx.user)).unwrap();
        assert_eq!(ids(&plain), vec![e3.id]);

        let query = NextUpQuery::new(fx.user).rewatching(true);
        let result = service.resolve_next_up(&query).unwrap();
        // The rewatch candidate ranks on E1's newer play.
        assert_eq!(ids(&result), vec![e2.id, e3.id]);
    }

    #[test]
    fn result_serializes_count_only_when_requested() {
        let counted = NextUpResult {
            items: Vec::new(),
            total_record_count: Some(0),
            start_index: 0,
        };
        let json = serde_json::to_value(&counted).unwrap();
        assert_eq!(json["total_record_count"], 0);

        let uncounted = NextUpResult {
            total_record_count: None,
            ..counted
        };
        let json = serde_json::to_value(&uncounted).unwrap();
        assert!(json.get("total_record_count").is_none());
        assert_eq!(json["start_index"], 0);
    }
}
