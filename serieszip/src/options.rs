use std::time::Duration;

/// [`Options`] customize the proxy's gather deadlines, admission control
/// and outbound connection pool.
///
/// In order to construct [`Options`] use [`OptionsBuilder`].
pub struct Options {
    pub(crate) total_timeout: Duration,
    pub(crate) after_first_timeout: Duration,
    pub(crate) concurrency_limit: usize,
    pub(crate) max_idle_conns_per_host: usize,
    pub(crate) buckets: usize,
}

/// [`OptionsBuilder`] builds [`Options`].
/// See available methods to see what can be tweaked.
pub struct OptionsBuilder {
    total_timeout: Option<Duration>,
    after_first_timeout: Option<Duration>,
    concurrency_limit: Option<usize>,
    max_idle_conns_per_host: Option<usize>,
    buckets: Option<usize>,
}

impl OptionsBuilder {
    /// Constructs [`OptionsBuilder`] with default values.
    ///
    /// Not all values have to be set, unset values fall back to
    /// [`Options::default`].
    pub fn new() -> Self {
        Self {
            total_timeout: None,
            after_first_timeout: None,
            concurrency_limit: None,
            max_idle_conns_per_host: None,
            buckets: None,
        }
    }

    /// Deadline for the whole gather while no backend has answered yet.
    ///
    /// By default 2 seconds.
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    /// Replacement deadline armed the moment the first backend answers
    /// successfully, so stragglers can't hold the response hostage.
    ///
    /// By default 500 milliseconds.
    pub fn after_first_timeout(mut self, timeout: Duration) -> Self {
        self.after_first_timeout = Some(timeout);
        self
    }

    /// Upper bound on concurrent in-flight requests per backend.
    ///
    /// By default 0, which disables admission control.
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Idle connection pool size per backend host.
    ///
    /// By default 100.
    pub fn max_idle_conns_per_host(mut self, max: usize) -> Self {
        self.max_idle_conns_per_host = Some(max);
        self
    }

    /// Number of 100ms request latency buckets tracked before the
    /// overflow bucket.
    ///
    /// By default 10.
    pub fn buckets(mut self, buckets: usize) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn build(self) -> Options {
        Options::from(self)
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        OptionsBuilder::new()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_millis(2000),
            after_first_timeout: Duration::from_millis(500),
            concurrency_limit: 0,
            max_idle_conns_per_host: 100,
            buckets: 10,
        }
    }
}

impl From<OptionsBuilder> for Options {
    fn from(builder: OptionsBuilder) -> Self {
        let default = Options::default();

        Self {
            total_timeout: builder.total_timeout.unwrap_or(default.total_timeout),
            after_first_timeout: builder
                .after_first_timeout
                .unwrap_or(default.after_first_timeout),
            concurrency_limit: builder
                .concurrency_limit
                .unwrap_or(default.concurrency_limit),
            max_idle_conns_per_host: builder
                .max_idle_conns_per_host
                .unwrap_or(default.max_idle_conns_per_host),
            buckets: builder.buckets.unwrap_or(default.buckets),
        }
    }
}
