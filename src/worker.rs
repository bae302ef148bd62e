//! Runs a decomposition on its own thread.
//!
//! The worker owns the [`Sink`] and is the only writer of the event stream;
//! the caller only reads it. Events arrive in ascending level order, and
//! every run ends with exactly one [`Event::Complete`] or [`Event::Failed`].

use std::path::{PathBuf};
use std::sync::{Arc};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info};

use crate::io::{load_image, Directory, GrayImage};
use crate::{derive_levels, Decomposer, Error, LevelSet, OverlapPolicy, ProgressEvent, Result, Sink};

// ----------------------------------------------------------------------------

/// One message from a running [`Worker`].
#[derive(Debug)]
pub enum Event {
    /// A level has been persisted.
    Progress(ProgressEvent),

    /// The run stopped. Levels reported before this remain persisted.
    Failed(Error),

    /// Every level has been persisted.
    Complete { levels: usize },
}

impl Event {
    /// Returns `true` for the last event of a run.
    pub fn is_terminal(&self) -> bool { !matches!(self, Event::Progress(_)) }
}

// ----------------------------------------------------------------------------

/// A handle to a decomposition running on another thread.
pub struct Worker {
    events: Receiver<Event>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn launch(body: impl 'static + Send + FnOnce(&Sender<Event>)) -> Self {
        let (sender, events) = mpsc::channel();
        let handle = thread::spawn(move || body(&sender));
        Self {events, handle}
    }

    /// Blocks until the next event, or returns `None` once the run is over
    /// and every event has been received.
    pub fn recv(&self) -> Option<Event> { self.events.recv().ok() }

    /// Iterates over the events as they arrive.
    pub fn events(&self) -> mpsc::Iter<'_, Event> { self.events.iter() }

    /// Waits for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        drop(self.events);
        self.handle.join()
    }
}

/// Sends `event`, returning `false` if nobody is listening any more.
fn publish(sender: &Sender<Event>, event: Event) -> bool {
    sender.send(event).is_ok()
}

/// Decomposes `gray`, reporting every level and then the outcome.
fn run(gray: &GrayImage, levels: &LevelSet, policy: OverlapPolicy, sink: impl Sink, sender: &Sender<Event>) {
    for result in Decomposer::new(gray, levels).policy(policy).decompose(sink) {
        match result {
            Ok(progress) => {
                if !publish(sender, Event::Progress(progress)) {
                    debug!("event receiver dropped; stopping");
                    return;
                }
            },
            Err(e) => {
                publish(sender, Event::Failed(e));
                return;
            },
        }
    }
    publish(sender, Event::Complete {levels: levels.len()});
}

/// Starts decomposing an image that has already been loaded.
pub fn spawn(
    gray: Arc<GrayImage>,
    levels: LevelSet,
    policy: OverlapPolicy,
    sink: impl 'static + Send + Sink,
) -> Worker {
    Worker::launch(move |sender| run(&gray, &levels, policy, sink, sender))
}

// ----------------------------------------------------------------------------

/// Everything needed to decompose one image file into a directory.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub count: i32,
    pub policy: OverlapPolicy,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, count: i32) -> Self {
        Self {input: input.into(), out_dir: out_dir.into(), count, policy: OverlapPolicy::default()}
    }

    pub fn policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the parameters without touching the filesystem.
    pub fn validate(&self) -> Result<LevelSet> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::InvalidParameter("no input image".into()));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParameter("no output directory".into()));
        }
        derive_levels(self.count)
    }

    /// Validates, creates the output directory, and starts a [`Worker`] that
    /// decodes the input and then decomposes it.
    ///
    /// Errors in the parameters or the output directory are returned here;
    /// everything later arrives as [`Event::Failed`].
    pub fn start(&self) -> Result<Worker> {
        let levels = self.validate()?;
        let sink = Directory::create(&self.out_dir)?;
        info!(
            "decomposing {} into {} levels (band width {}) in {}",
            self.input.display(), levels.len(), levels.band_width(), sink.path().display(),
        );
        let input = self.input.clone();
        let policy = self.policy;
        Ok(Worker::launch(move |sender| {
            match load_image(&input) {
                Ok(gray) => run(&gray, &levels, policy, sink, sender),
                Err(e) => { publish(sender, Event::Failed(e)); },
            }
        }))
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Mutex};

    use super::*;
    use crate::{LevelImage};

    /// Records the order in which levels reach the sink.
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Sink for Shared {
        fn emit(&mut self, level: u8, _image: &LevelImage) -> Result<PathBuf> {
            self.0.lock().unwrap().push(level);
            Ok(PathBuf::from(crate::io::file_name(level)))
        }
    }

    struct Refuse;

    impl Sink for Refuse {
        fn emit(&mut self, level: u8, _image: &LevelImage) -> Result<PathBuf> {
            Err(Error::unavailable(crate::io::file_name(level), "read-only"))
        }
    }

    fn gray() -> Arc<GrayImage> {
        Arc::new(GrayImage::new(8, 4, (0..32).map(|i| i * 8).collect()).unwrap())
    }

    #[test]
    fn events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = spawn(gray(), derive_levels(4).unwrap(), OverlapPolicy::default(), Shared(seen.clone()));
        let events: Vec<Event> = worker.events().collect();
        worker.join().unwrap();

        assert_eq!(events.len(), 5);
        let levels: Vec<u8> = events.iter().filter_map(|e| match e {
            Event::Progress(p) => Some(p.level),
            _ => None,
        }).collect();
        assert_eq!(levels, vec![0, 64, 128, 192]);
        assert!(events[..4].iter().all(|e| !e.is_terminal()));
        assert!(matches!(events[4], Event::Complete {levels: 4}));
        assert_eq!(*seen.lock().unwrap(), levels);
    }

    #[test]
    fn failure_is_the_last_event() {
        let worker = spawn(gray(), derive_levels(4).unwrap(), OverlapPolicy::default(), Refuse);
        let events: Vec<Event> = worker.events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Failed(Error::ResourceUnavailable {..})));
        assert!(events[0].is_terminal());
    }

    #[test]
    fn shared_gray_image() {
        let gray = gray();
        let worker = spawn(gray.clone(), derive_levels(2).unwrap(), OverlapPolicy::NearestOnly, Shared(Default::default()));
        assert_eq!(gray[(3, 7)], 248);
        while let Some(event) = worker.recv() {
            if let Event::Progress(p) = event {
                assert_eq!(p.image.size(), gray.size());
            }
        }
    }

    #[test]
    fn boxed_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: Box<dyn Sink + Send> = Box::new(Shared(seen.clone()));
        let worker = spawn(gray(), derive_levels(2).unwrap(), OverlapPolicy::default(), sink);
        let last = worker.events().last().unwrap();
        assert!(matches!(last, Event::Complete {levels: 2}));
        assert_eq!(*seen.lock().unwrap(), vec![0, 128]);
    }

    /// Waits for a permit before accepting each level; once the permits run
    /// out it accepts everything.
    struct Gated {
        permits: Receiver<()>,
        seen: Arc<Mutex<Vec<u8>>>,
    }

    impl Sink for Gated {
        fn emit(&mut self, level: u8, _image: &LevelImage) -> Result<PathBuf> {
            let _ = self.permits.recv();
            self.seen.lock().unwrap().push(level);
            Ok(PathBuf::from(crate::io::file_name(level)))
        }
    }

    #[test]
    fn stops_when_nobody_listens() {
        let (permit, permits) = mpsc::channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Gated {permits, seen: seen.clone()};
        let worker = spawn(gray(), derive_levels(4).unwrap(), OverlapPolicy::default(), sink);

        permit.send(()).unwrap();
        assert!(matches!(worker.recv(), Some(Event::Progress(ProgressEvent {level: 0, ..}))));

        // Level 64 is still waiting at the gate when the receiver goes away.
        let Worker {events, handle} = worker;
        drop(events);
        drop(permit);
        handle.join().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 64]);
    }

    #[test]
    fn job_validation() {
        assert!(matches!(Job::new("", "out", 8).validate(), Err(Error::InvalidParameter(_))));
        assert!(matches!(Job::new("in.png", "", 8).validate(), Err(Error::InvalidParameter(_))));
        assert!(matches!(Job::new("in.png", "out", 0).validate(), Err(Error::InvalidParameter(_))));
        assert!(matches!(Job::new("in.png", "out", 257).start(), Err(Error::InvalidParameter(_))));
        assert_eq!(Job::new("in.png", "out", 8).validate().unwrap().len(), 8);
    }

    #[test]
    fn job_with_missing_input() {
        let mut out_dir = std::env::temp_dir();
        out_dir.push(format!("graybands-worker-missing-{}", std::process::id()));
        let worker = Job::new(out_dir.join("absent.png"), &out_dir, 4).start().unwrap();
        let events: Vec<Event> = worker.events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Failed(Error::ResourceUnavailable {..})));
        std::fs::remove_dir_all(&out_dir).unwrap();
    }
}
