//! The adaptive playback engine.
//!
//! One [`Player`] owns the transport, the render sink and the current
//! playback item. Each item carries its own timeline, sample queue and
//! init-section cache; the self-scheduling refill loop keeps the queue
//! filled up to the back-pressure ceiling. All operations require a tokio
//! runtime, since the per-segment pipeline runs on spawned tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use fmp4::{DecodedUnit, DecoderConfig, demux_fragment, extract_decoder_config};
use parking_lot::Mutex;
use playlist::{MediaPlaylist, MultivariantPlaylist, ParseOptions, Segment};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{PlaybackState, PlayerError};
use crate::fetch::MediaFetcher;
use crate::queue::SampleQueue;
use crate::sink::RenderSink;
use crate::timeline::{TimelineSegment, build_timeline, select_stream};

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Rate installed by `play()`.
    pub default_rate: f64,
    /// Back-pressure ceiling on queued plus in-flight sample units.
    pub buffer_ahead: usize,
    /// Initial bitrate target, bits per second. Zero selects the lowest
    /// rendition.
    pub target_bitrate: u64,
    pub strict_parsing: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_rate: 1.0,
            buffer_ahead: 6,
            target_bitrate: 0,
            strict_parsing: false,
        }
    }
}

/// One playback item: everything tied to the URL given to `set_item`.
/// Replaced wholesale when the item changes; stale async completions keep a
/// handle to the old item and are discarded by the epoch check.
struct Item {
    epoch: u64,
    url: Url,
    cancel: CancellationToken,
    multivariant: Mutex<Option<MultivariantPlaylist>>,
    timeline: Mutex<Vec<TimelineSegment>>,
    /// Set once the first media playlist has been loaded and the timeline
    /// built; the refill loop does nothing before that.
    ready: AtomicBool,
    queue: Mutex<SampleQueue>,
    /// Decoder configs keyed by init-section URI. Append-only for the life
    /// of the item; the set of distinct init sections is small.
    init_cache: Mutex<HashMap<String, DecoderConfig>>,
    /// Armed when the sink clock was already past zero at install time; the
    /// first unit at timeline start 0 is then suppressed once.
    suppress_first: AtomicBool,
}

struct Inner {
    fetcher: Arc<dyn MediaFetcher>,
    sink: Arc<dyn RenderSink>,
    config: PlayerConfig,
    target_bitrate: AtomicU64,
    state: Mutex<PlaybackState>,
    item: Mutex<Option<Arc<Item>>>,
    /// Bumped by `set_item`; completions whose item epoch no longer matches
    /// are stale and must not touch engine state.
    epoch: AtomicU64,
    rate: Mutex<f64>,
    volume: Mutex<f64>,
    muted: AtomicBool,
    /// Outstanding engine tasks, for `idle()`.
    pending: AtomicUsize,
    quiescent: Notify,
}

pub struct Player {
    inner: Arc<Inner>,
}

impl Player {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        sink: Arc<dyn RenderSink>,
        config: PlayerConfig,
    ) -> Self {
        let target_bitrate = AtomicU64::new(config.target_bitrate);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                sink,
                config,
                target_bitrate,
                state: Mutex::new(PlaybackState::Loading),
                item: Mutex::new(None),
                epoch: AtomicU64::new(0),
                rate: Mutex::new(0.0),
                volume: Mutex::new(1.0),
                muted: AtomicBool::new(false),
                pending: AtomicUsize::new(0),
                quiescent: Notify::new(),
            }),
        }
    }

    /// Replace the current playback item. Resets the sink clock, discards
    /// the old item, and begins loading the multivariant manifest. `None`
    /// just tears the current item down.
    pub fn set_item(&self, url: Option<Url>) {
        let inner = &self.inner;
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let clock_was_running = inner.sink.position() > 0.0;
        inner.sink.flush();
        inner.sink.seek(0.0);

        let mut slot = inner.item.lock();
        if let Some(old) = slot.take() {
            old.cancel.cancel();
        }
        *inner.state.lock() = PlaybackState::Loading;
        let Some(url) = url else {
            return;
        };

        info!("loading item {url}");
        let item = Arc::new(Item {
            epoch,
            url,
            cancel: CancellationToken::new(),
            multivariant: Mutex::new(None),
            timeline: Mutex::new(Vec::new()),
            ready: AtomicBool::new(false),
            queue: Mutex::new(SampleQueue::new()),
            init_cache: Mutex::new(HashMap::new()),
            suppress_first: AtomicBool::new(clock_was_running),
        });
        *slot = Some(Arc::clone(&item));
        drop(slot);

        let inner = Arc::clone(&self.inner);
        self.inner.spawn(async move {
            let result = Inner::load_item(&inner, &item).await;
            if inner.stale(&item) {
                return;
            }
            match result {
                Ok(()) => inner.update_sample_buffers(&item),
                Err(e) => inner.set_state(PlaybackState::Error(Arc::new(e))),
            }
        });
    }

    /// Re-select the rendition for the new target and reload its media
    /// playlist. Rebuilding the timeline discards the queued samples; units
    /// still in flight are re-validated against the new timeline when they
    /// arrive.
    pub fn set_target_bitrate(&self, bps: u64) {
        self.inner.target_bitrate.store(bps, Ordering::SeqCst);
        let Some(item) = self.inner.item.lock().clone() else {
            return;
        };
        debug!("bitrate target now {bps} bps");
        self.inner.set_state(PlaybackState::Loading);
        let inner = Arc::clone(&self.inner);
        self.inner.spawn(async move {
            let result = Inner::load_media_playlist(&inner, &item).await;
            if inner.stale(&item) {
                return;
            }
            match result {
                Ok(()) => inner.update_sample_buffers(&item),
                Err(e) => inner.set_state(PlaybackState::Error(Arc::new(e))),
            }
        });
    }

    /// Move the playback origin. Queued samples are discarded; in-flight
    /// fetches are not cancelled, their late results are filtered by the
    /// timestamp test on arrival.
    pub fn seek(&self, to: f64) {
        self.inner.sink.flush();
        self.inner.sink.seek(to);
        let Some(item) = self.inner.item.lock().clone() else {
            return;
        };
        item.queue.lock().clear_queued();
        self.trigger_refill(&item);
    }

    pub fn play(&self) {
        self.set_rate(self.inner.config.default_rate);
    }

    pub fn pause(&self) {
        self.set_rate(0.0);
    }

    pub fn set_rate(&self, rate: f64) {
        *self.inner.rate.lock() = rate;
        self.inner.sink.set_rate(rate);
    }

    pub fn rate(&self) -> f64 {
        *self.inner.rate.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.rate() > 0.0
    }

    pub fn set_volume(&self, volume: f64) {
        *self.inner.volume.lock() = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f64 {
        *self.inner.volume.lock()
    }

    pub fn mute(&self) {
        self.inner.muted.store(true, Ordering::SeqCst);
    }

    pub fn unmute(&self) {
        self.inner.muted.store(false, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().clone()
    }

    /// Current media clock position in seconds.
    pub fn position(&self) -> f64 {
        self.inner.sink.position()
    }

    /// Pop the earliest queued sample unit and re-invoke the refill loop.
    /// Returns `None` when the queue is empty; the consumer polls again
    /// later. A unit at timeline start 0 is suppressed at most once per item
    /// when the previous item's clock had already advanced, so a stale first
    /// frame is not re-presented after the timestamp-origin reset.
    pub fn next_sample(&self) -> Option<DecodedUnit> {
        let item = self.inner.item.lock().clone()?;
        loop {
            let popped = item.queue.lock().pop_front();
            let Some((start, unit)) = popped else {
                self.trigger_refill(&item);
                return None;
            };
            if start == 0.0 && item.suppress_first.swap(false, Ordering::SeqCst) {
                debug!("suppressing stale first frame after timestamp-origin reset");
                continue;
            }
            self.trigger_refill(&item);
            return Some(unit);
        }
    }

    /// Wait until no engine tasks are outstanding.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.quiescent.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn trigger_refill(&self, item: &Arc<Item>) {
        let inner = Arc::clone(&self.inner);
        let item = Arc::clone(item);
        self.inner.spawn(async move {
            inner.update_sample_buffers(&item);
        });
    }
}

impl Inner {
    /// Spawn an engine task, tracking it for `idle()`.
    fn spawn<F>(self: &Arc<Self>, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            fut.await;
            if inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                inner.quiescent.notify_waiters();
            }
        });
    }

    /// Whether a completion belongs to a replaced or torn-down item.
    fn stale(&self, item: &Item) -> bool {
        self.epoch.load(Ordering::SeqCst) != item.epoch || item.cancel.is_cancelled()
    }

    fn set_state(&self, next: PlaybackState) {
        let mut state = self.state.lock();
        trace!("playback state {:?} -> {next:?}", *state);
        *state = next;
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict: self.config.strict_parsing,
        }
    }

    async fn load_item(inner: &Arc<Self>, item: &Arc<Item>) -> Result<(), PlayerError> {
        let bytes = inner.fetcher.fetch(&item.url).await?;
        let multivariant =
            MultivariantPlaylist::parse(&bytes, &item.url, &inner.parse_options())?;
        *item.multivariant.lock() = Some(multivariant);
        Self::load_media_playlist(inner, item).await
    }

    /// Select the rendition for the current bitrate target, load its media
    /// playlist and rebuild the timeline. Queued samples do not survive a
    /// timeline rebuild.
    async fn load_media_playlist(inner: &Arc<Self>, item: &Arc<Item>) -> Result<(), PlayerError> {
        let target = inner.target_bitrate.load(Ordering::SeqCst);
        let stream_url = {
            let guard = item.multivariant.lock();
            let Some(multivariant) = guard.as_ref() else {
                // The multivariant manifest is still loading; it will pick
                // up the current target when it finishes.
                return Ok(());
            };
            select_stream(&multivariant.streams, target)?.uri.clone()
        };
        debug!("selected rendition {stream_url}");

        let bytes = inner.fetcher.fetch(&stream_url).await?;
        let media = {
            let guard = item.multivariant.lock();
            MediaPlaylist::parse(&bytes, &stream_url, guard.as_ref(), &inner.parse_options())?
        };
        let timeline = build_timeline(&media);
        debug!("timeline rebuilt with {} segments", timeline.len());

        item.queue.lock().clear_queued();
        *item.timeline.lock() = timeline;
        item.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// The refill loop. Drops already-passed queued units, then schedules
    /// segment loads until the back-pressure ceiling is reached or the
    /// timeline is exhausted. Self-scheduling: re-invoked after every load
    /// completion and every consumption, never by a timer.
    fn update_sample_buffers(self: &Arc<Self>, item: &Arc<Item>) {
        if self.stale(item) || !item.ready.load(Ordering::SeqCst) {
            return;
        }
        if self.state.lock().is_terminal() {
            return;
        }

        let position = self.sink.position();
        let mut queue = item.queue.lock();
        queue.drop_before(position);
        if queue.loaded_count() >= self.config.buffer_ahead {
            drop(queue);
            self.set_state(PlaybackState::Waiting);
            return;
        }

        let timeline = item.timeline.lock();
        if timeline.is_empty() {
            drop(timeline);
            drop(queue);
            self.set_state(PlaybackState::Error(Arc::new(PlayerError::NoSegments)));
            return;
        }

        let mut scheduled = false;
        while queue.loaded_count() < self.config.buffer_ahead {
            let Some(next) = timeline
                .iter()
                .find(|entry| entry.start >= position && !queue.tracks(entry.start))
            else {
                break;
            };
            queue.mark_in_flight(next.start);
            scheduled = true;
            trace!("scheduling segment at {}: {}", next.start, next.segment.uri);

            let inner = Arc::clone(self);
            let item = Arc::clone(item);
            let start = next.start;
            let segment = next.segment.clone();
            self.spawn(async move {
                Inner::load_segment(inner, item, start, segment).await;
            });
        }
        let nothing_in_flight = queue.in_flight_count() == 0;
        drop(timeline);
        drop(queue);

        if scheduled {
            self.set_state(PlaybackState::Loading);
        } else if nothing_in_flight {
            debug!("timeline exhausted");
            self.set_state(PlaybackState::Finished);
        }
    }

    /// One segment's pipeline: init section (cached), segment bytes, demux,
    /// ordered insert. Any failure is terminal for the item.
    async fn load_segment(inner: Arc<Self>, item: Arc<Item>, start: f64, segment: Segment) {
        let result = Self::fetch_and_demux(&inner, &item, &segment).await;
        item.queue.lock().clear_in_flight(start);

        if inner.stale(&item) {
            trace!("discarding completion for a replaced item at {start}");
            return;
        }
        if inner.state.lock().is_error() {
            return;
        }
        match result {
            Ok(unit) => {
                let wanted = item
                    .timeline
                    .lock()
                    .iter()
                    .any(|entry| entry.start.to_bits() == start.to_bits());
                if wanted {
                    item.queue.lock().insert(start, unit);
                } else {
                    debug!("segment at {start} left the timeline, discarding its samples");
                }
                inner.update_sample_buffers(&item);
            }
            Err(e) => {
                warn!("segment pipeline failed at {start}: {e}");
                inner.set_state(PlaybackState::Error(Arc::new(e)));
            }
        }
    }

    async fn fetch_and_demux(
        inner: &Arc<Self>,
        item: &Arc<Item>,
        segment: &Segment,
    ) -> Result<DecodedUnit, PlayerError> {
        let init = segment.init_section.as_ref().ok_or(PlayerError::NoInitSection)?;
        let key = init.uri.to_string();
        let cached = item.init_cache.lock().get(&key).cloned();
        let config = match cached {
            Some(config) => config,
            None => {
                let bytes = match &init.range {
                    Some(range) => inner.fetcher.fetch_range(&init.uri, range).await?,
                    None => inner.fetcher.fetch(&init.uri).await?,
                };
                let config = extract_decoder_config(&bytes)?;
                item.init_cache
                    .lock()
                    .entry(key)
                    .or_insert(config)
                    .clone()
            }
        };

        let bytes = match &segment.subrange {
            Some(range) => inner.fetcher.fetch_range(&segment.uri, range).await?,
            None => inner.fetcher.fetch(&segment.uri).await?,
        };
        Ok(demux_fragment(&bytes, config.timescale)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, MediaFetcher};
    use crate::sink::NullSink;
    use async_trait::async_trait;
    use bytes::Bytes;
    use fmp4::test_support::{FragmentSpec, make_init_segment, make_media_segment};
    use playlist::ByteRange;
    use reqwest::StatusCode;

    const TIMESCALE: u32 = 90_000;
    /// 4 seconds per segment, in timescale ticks.
    const SEGMENT_TICKS: u32 = 4 * TIMESCALE;

    struct MapFetcher {
        resources: HashMap<String, Bytes>,
        log: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new() -> Self {
            Self {
                resources: HashMap::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn insert(&mut self, url: &str, bytes: impl Into<Bytes>) {
            self.resources.insert(url.to_string(), bytes.into());
        }

        fn fetch_count(&self) -> usize {
            self.log.lock().len()
        }

        fn fetches_of(&self, url: &str) -> usize {
            self.log.lock().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl MediaFetcher for MapFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
            self.log.lock().push(url.to_string());
            self.resources
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status {
                    url: url.to_string(),
                    status: StatusCode::NOT_FOUND,
                })
        }

        async fn fetch_range(&self, url: &Url, range: &ByteRange) -> Result<Bytes, FetchError> {
            let all = self.fetch(url).await?;
            all.get(range.offset as usize..range.end() as usize)
                .map(Bytes::copy_from_slice)
                .ok_or(FetchError::RangeNotSatisfied {
                    url: url.to_string(),
                    status: StatusCode::RANGE_NOT_SATISFIABLE,
                })
        }
    }

    fn init_bytes() -> Bytes {
        make_init_segment(TIMESCALE, &[0x67, 0x64, 0x00, 0x1F], &[0x68, 0xEB])
    }

    /// One 4-second segment with a single sample whose payload identifies
    /// the segment.
    fn segment_bytes(index: u8, payload_tag: u8) -> Bytes {
        let payload = [payload_tag; 4];
        let samples: [&[u8]; 1] = [&payload];
        make_media_segment(&[FragmentSpec {
            base_decode_time: index as u64 * SEGMENT_TICKS as u64,
            default_duration: SEGMENT_TICKS,
            samples: &samples,
            composition_offsets: &[0],
        }])
    }

    fn media_manifest(prefix: &str, count: usize) -> String {
        let mut text = String::from(
            "#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXT-X-MAP:URI=\"init.mp4\"\n",
        );
        for i in 0..count {
            text.push_str(&format!("#EXTINF:4.0,\n{prefix}{i}.m4s\n"));
        }
        text.push_str("#EXT-X-ENDLIST\n");
        text
    }

    /// Two renditions sharing one init section; `low` payload tags are the
    /// segment index, `hi` tags are offset by 100.
    fn fixture(count: usize) -> MapFetcher {
        let mut fetcher = MapFetcher::new();
        fetcher.insert(
            "http://test.local/main.m3u8",
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=1280000\nlow.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2560000\nhi.m3u8\n",
        );
        fetcher.insert("http://test.local/low.m3u8", media_manifest("low", count));
        fetcher.insert("http://test.local/hi.m3u8", media_manifest("hi", count));
        fetcher.insert("http://test.local/init.mp4", init_bytes());
        for i in 0..count {
            fetcher.insert(
                &format!("http://test.local/low{i}.m4s"),
                segment_bytes(i as u8, i as u8),
            );
            fetcher.insert(
                &format!("http://test.local/hi{i}.m4s"),
                segment_bytes(i as u8, 100 + i as u8),
            );
        }
        fetcher
    }

    fn item_url() -> Url {
        Url::parse("http://test.local/main.m3u8").unwrap()
    }

    /// Opt-in log output via RUST_LOG.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn player(fetcher: MapFetcher) -> (Player, Arc<NullSink>, Arc<MapFetcher>) {
        let fetcher = Arc::new(fetcher);
        let sink = Arc::new(NullSink::new());
        let player = Player::new(
            Arc::clone(&fetcher) as Arc<dyn MediaFetcher>,
            Arc::clone(&sink) as Arc<dyn RenderSink>,
            PlayerConfig::default(),
        );
        (player, sink, fetcher)
    }

    fn loaded_count(player: &Player) -> usize {
        let item = player.inner.item.lock().clone().unwrap();
        let count = item.queue.lock().loaded_count();
        count
    }

    fn assert_no_segments(state: &PlaybackState) {
        let PlaybackState::Error(cause) = state else {
            panic!("expected an error state, got {state:?}");
        };
        assert!(matches!(**cause, PlayerError::NoSegments));
    }

    #[tokio::test]
    async fn fills_queue_and_finishes() {
        init_tracing();
        let (player, _sink, _fetcher) = player(fixture(3));
        player.set_item(Some(item_url()));
        player.idle().await;

        assert!(matches!(player.state(), PlaybackState::Finished));
        for expected in 0u8..3 {
            let unit = player.next_sample().expect("queued unit");
            assert_eq!(unit.payload.as_ref(), &[expected; 4]);
        }
        assert!(player.next_sample().is_none());
    }

    #[tokio::test]
    async fn respects_the_back_pressure_ceiling() {
        let (player, _sink, _fetcher) = player(fixture(8));
        player.set_item(Some(item_url()));
        player.idle().await;

        assert_eq!(loaded_count(&player), 6);
        assert!(matches!(player.state(), PlaybackState::Waiting));

        // Draining makes room; the refill tops the queue back up.
        assert!(player.next_sample().is_some());
        assert!(player.next_sample().is_some());
        player.idle().await;
        assert_eq!(loaded_count(&player), 6);
    }

    #[tokio::test]
    async fn clock_advance_drops_passed_samples_on_refill() {
        let (player, sink, _fetcher) = player(fixture(8));
        player.set_item(Some(item_url()));
        player.idle().await;
        assert_eq!(loaded_count(&player), 6);

        // The clock moves past the segments at 4.0 and 8.0 while they sit
        // queued.
        sink.advance(10.0);
        let first = player.next_sample().unwrap();
        assert_eq!(first.payload.as_ref(), &[0; 4]);
        player.idle().await;

        // The passed units were discarded and refill resumed at 12.0; the
        // segments at 12, 16, 20, 24 and 28 remain.
        let item = player.inner.item.lock().clone().unwrap();
        let (queued, in_flight) = {
            let queue = item.queue.lock();
            (queue.queued_count(), queue.in_flight_count())
        };
        assert_eq!((queued, in_flight), (5, 0));
        let unit = player.next_sample().unwrap();
        assert_eq!(unit.payload.as_ref(), &[3; 4]);
    }

    #[tokio::test]
    async fn seek_clears_the_queue_and_refills_from_the_target() {
        let (player, _sink, _fetcher) = player(fixture(8));
        player.set_item(Some(item_url()));
        player.idle().await;

        player.seek(16.0);
        assert_eq!(loaded_count(&player), 0);

        player.idle().await;
        // Segments at 16, 20, 24, 28.
        assert_eq!(loaded_count(&player), 4);
        let unit = player.next_sample().unwrap();
        assert_eq!(unit.payload.as_ref(), &[4; 4]);
    }

    #[tokio::test]
    async fn pipeline_failure_is_a_terminal_error() {
        let mut fetcher = fixture(3);
        fetcher.resources.remove("http://test.local/low1.m4s");
        let (player, _sink, _fetcher) = player(fetcher);
        player.set_item(Some(item_url()));
        player.idle().await;

        let PlaybackState::Error(cause) = player.state() else {
            panic!("expected an error state, got {:?}", player.state());
        };
        assert!(matches!(*cause, PlayerError::Fetch(_)));
    }

    #[tokio::test]
    async fn empty_timeline_is_no_segments() {
        let (player, _sink, _fetcher) = player(fixture(0));
        player.set_item(Some(item_url()));
        player.idle().await;
        assert_no_segments(&player.state());
    }

    #[tokio::test]
    async fn init_section_is_fetched_once_per_item() {
        let (player, _sink, fetcher) = player(fixture(3));
        player.set_item(Some(item_url()));
        player.idle().await;

        assert_eq!(fetcher.fetches_of("http://test.local/init.mp4"), 1);
    }

    #[tokio::test]
    async fn finished_issues_no_further_fetches() {
        let (player, _sink, fetcher) = player(fixture(3));
        player.set_item(Some(item_url()));
        player.idle().await;
        assert!(matches!(player.state(), PlaybackState::Finished));

        let fetches = fetcher.fetch_count();
        while player.next_sample().is_some() {}
        player.idle().await;
        assert_eq!(fetcher.fetch_count(), fetches);
        assert!(matches!(player.state(), PlaybackState::Finished));
    }

    #[tokio::test]
    async fn bitrate_switch_reloads_the_selected_rendition() {
        let (player, _sink, _fetcher) = player(fixture(3));
        player.set_item(Some(item_url()));
        player.idle().await;
        assert_eq!(player.next_sample().unwrap().payload.as_ref(), &[0; 4]);

        player.set_target_bitrate(3_000_000);
        player.idle().await;
        let unit = player.next_sample().unwrap();
        assert_eq!(unit.payload.as_ref(), &[100; 4]);
    }

    #[tokio::test]
    async fn stale_first_frame_is_suppressed_once() {
        let (player, sink, _fetcher) = player(fixture(3));
        // A previous item left the clock mid-stream.
        sink.advance(5.0);
        player.set_item(Some(item_url()));
        player.idle().await;

        // The unit at timeline start 0 is swallowed; playback resumes with
        // the next one.
        let unit = player.next_sample().unwrap();
        assert_eq!(unit.payload.as_ref(), &[1; 4]);
    }

    #[tokio::test]
    async fn map_byte_ranges_become_range_requests() {
        let mut fetcher = MapFetcher::new();
        let init = init_bytes();
        let segment = segment_bytes(0, 7);
        // Init section and segment packed into one resource.
        let mut packed = init.to_vec();
        packed.extend_from_slice(&segment);
        fetcher.insert("http://test.local/packed.mp4", packed);
        fetcher.insert(
            "http://test.local/media.m3u8",
            format!(
                "#EXTM3U\n#EXT-X-TARGETDURATION:4\n\
                 #EXT-X-MAP:URI=\"packed.mp4\",BYTERANGE=\"{}@0\"\n\
                 #EXTINF:4.0,\n#EXT-X-BYTERANGE:{}@{}\npacked.mp4\n\
                 #EXT-X-ENDLIST\n",
                init.len(),
                segment.len(),
                init.len(),
            ),
        );
        fetcher.insert(
            "http://test.local/main.m3u8",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000\nmedia.m3u8\n",
        );

        let (player, _sink, _fetcher) = player(fetcher);
        player.set_item(Some(item_url()));
        player.idle().await;

        assert!(matches!(player.state(), PlaybackState::Finished));
        let unit = player.next_sample().unwrap();
        assert_eq!(unit.payload.as_ref(), &[7; 4]);
    }

    #[tokio::test]
    async fn play_and_pause_drive_the_sink_rate() {
        let (player, sink, _fetcher) = player(fixture(1));
        player.play();
        assert!(player.is_playing());
        assert_eq!(sink.rate(), 1.0);
        player.pause();
        assert!(!player.is_playing());
        assert_eq!(sink.rate(), 0.0);
    }
}
