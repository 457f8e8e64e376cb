use kernel_info::memory::{MAX_RESIDENT_PAGES, MAX_TOTAL_PAGES};

/// Tunables of the paging subsystem.
///
/// ### Example
/// ```rust
/// # use kernel_swap::PagingConfig;
/// let cfg = PagingConfig::DEFAULT
///     .with_max_total_pages(8)
///     .with_max_resident_pages(2)
///     .validate()
///     .unwrap();
/// assert_eq!(cfg.max_total_pages, 8);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PagingConfig {
    /// Capacity of each process's eviction queue.
    pub max_total_pages: usize,
    /// Resident pages a process may hold before mapping or restoring a page
    /// evicts one of its own first.
    pub max_resident_pages: usize,
}

impl PagingConfig {
    pub const DEFAULT: Self = Self {
        max_total_pages: MAX_TOTAL_PAGES,
        max_resident_pages: MAX_RESIDENT_PAGES,
    };

    #[must_use]
    pub const fn with_max_total_pages(mut self, pages: usize) -> Self {
        self.max_total_pages = pages;
        self
    }

    #[must_use]
    pub const fn with_max_resident_pages(mut self, pages: usize) -> Self {
        self.max_resident_pages = pages;
        self
    }

    /// Reject configurations that cannot make progress.
    ///
    /// # Errors
    /// See [`ConfigError`].
    pub const fn validate(self) -> Result<Self, ConfigError> {
        if self.max_total_pages == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_resident_pages == 0 {
            return Err(ConfigError::ZeroResidentLimit);
        }
        Ok(self)
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("eviction queue capacity must be non-zero")]
    ZeroQueueCapacity,
    #[error("resident page limit must be non-zero")]
    ZeroResidentLimit,
}
