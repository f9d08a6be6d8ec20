//! Job creator
//!
//! Holds an in-progress job and datafeed definition. Wizards mutate it
//! through typed accessors, then submit it with [`JobCreator::create_job`],
//! [`JobCreator::create_datafeed`] and [`JobCreator::start_datafeed`], or all
//! three with [`JobCreator::create_and_start_job`].
//!
//! Optional settings follow one rule: writing `None` removes the key, and a
//! parent object left empty is removed with it.

use std::sync::Arc;

use mlj_catalog::sparse::is_sparse_variant;
use mlj_catalog::{catalog, combine_fields_and_aggs, to_standard, Aggregation, Field, FieldCapabilities, FieldType};
use mlj_config::{
    add_exclude_frozen_to_query, datafeed_aggregation_fields, filter_runtime_mappings,
    interval_ms, CreatedBy, CustomSettings, CustomUrl, DatafeedConfig, Detector, JobConfig,
    ModelPlotConfig, PerPartitionCategorization, RuntimeMappings,
};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::api::{CalendarService, MlApi, TimeFieldRangeRequest};
use crate::detectors::{DetectorEntry, DetectorSet};
use crate::error::{CreatorError, LifecycleError};
use crate::lifecycle::{JobLifecycle, LifecycleState, SubmissionStage};
use crate::runner::JobRunner;
use crate::settings::CreatorSettings;
use crate::types::{Calendar, DataSource, JobType, ProgressSubscriber, SavedSearch, SavedSearchQuery, StopHandle};

/// Builds and submits one anomaly-detection job
pub struct JobCreator {
    api: Arc<dyn MlApi>,
    calendar_service: Arc<dyn CalendarService>,
    settings: CreatorSettings,
    job_type: JobType,
    data_source: DataSource,
    saved_search: Option<SavedSearch>,
    index_pattern_title: String,
    index_pattern_display_name: String,
    job_config: JobConfig,
    datafeed_config: DatafeedConfig,
    detectors: DetectorSet,
    calendars: Vec<Calendar>,
    bucket_span_ms: u64,
    use_dedicated_index: bool,
    sparse_data: bool,
    start: i64,
    end: i64,
    subscribers: Vec<ProgressSubscriber>,
    script_fields: Vec<Field>,
    runtime_fields: Vec<Field>,
    aggregation_fields: Vec<Field>,
    filter_runtime_mappings_on_save: bool,
    stop_refresh_polls: StopHandle,
    lifecycle: JobLifecycle,
}

impl JobCreator {
    /// Create a creator for a new job over `data_source`
    #[must_use]
    pub fn new(
        api: Arc<dyn MlApi>,
        calendar_service: Arc<dyn CalendarService>,
        data_source: DataSource,
        saved_search: Option<SavedSearch>,
        query: JsonValue,
        settings: CreatorSettings,
    ) -> Self {
        let index_pattern_title = data_source.title.clone();
        let index_pattern_display_name = data_source.display_name();

        let mut job_config = JobConfig::empty();
        if let Some(time_field) = &data_source.time_field_name {
            job_config.data_description.time_field.clone_from(time_field);
        }

        let mut datafeed_config = DatafeedConfig::empty(&index_pattern_title);
        if let Some(runtime_fields) = &data_source.runtime_field_map {
            let mappings = datafeed_config
                .runtime_mappings
                .get_or_insert_with(RuntimeMappings::new);
            for (name, definition) in runtime_fields {
                mappings.insert(name.clone(), definition.clone());
            }
        }
        datafeed_config.query = query;

        let mut creator = Self {
            api,
            calendar_service,
            filter_runtime_mappings_on_save: settings.filter_runtime_mappings_on_save,
            settings,
            job_type: JobType::default(),
            data_source,
            saved_search,
            index_pattern_title,
            index_pattern_display_name,
            job_config,
            datafeed_config,
            detectors: DetectorSet::new(),
            calendars: Vec::new(),
            bucket_span_ms: 0,
            use_dedicated_index: false,
            sparse_data: false,
            start: 0,
            end: 0,
            subscribers: Vec::new(),
            script_fields: Vec::new(),
            runtime_fields: Vec::new(),
            aggregation_fields: Vec::new(),
            stop_refresh_polls: StopHandle::new(),
            lifecycle: JobLifecycle::Draft,
        };
        creator.populate_runtime_fields();
        debug!(index = %creator.index_pattern_title, "job creator ready");
        creator
    }

    /// With the owning wizard; records its created-by label
    #[must_use]
    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self.set_created_by(Some(job_type.created_by()));
        self
    }

    /// Wizard that owns the job
    #[inline]
    #[must_use]
    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    /// Tunables in effect
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &CreatorSettings {
        &self.settings
    }

    /// Data view the job reads
    #[inline]
    #[must_use]
    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    /// Saved object id of the data view
    #[inline]
    #[must_use]
    pub fn data_source_id(&self) -> Option<&str> {
        self.data_source.id.as_deref()
    }

    /// Saved search the job is based on, if any
    #[inline]
    #[must_use]
    pub fn saved_search(&self) -> Option<&SavedSearch> {
        self.saved_search.as_ref()
    }

    /// Query and filters of the saved search, if the job is based on one
    #[must_use]
    pub fn saved_search_query(&self) -> Option<SavedSearchQuery> {
        self.saved_search.as_ref().map(|s| SavedSearchQuery {
            query: s.query.clone(),
            filters: s.filters.clone(),
        })
    }

    /// Index pattern the datafeed reads
    #[inline]
    #[must_use]
    pub fn index_pattern_title(&self) -> &str {
        &self.index_pattern_title
    }

    /// Name of the data view as shown to users
    #[inline]
    #[must_use]
    pub fn index_pattern_display_name(&self) -> &str {
        &self.index_pattern_display_name
    }

    // Detectors

    /// Append a detector and re-apply the sparse data setting
    pub fn add_detector(&mut self, detector: Detector, aggregation: Aggregation, field: Field) {
        self.detectors
            .push(DetectorEntry::new(detector, aggregation, field));
        self.detectors.apply_sparse_data(self.sparse_data);
        self.sync_detectors();
    }

    /// Replace the detector at `index`
    ///
    /// Returns false, leaving every detector untouched, when `index` is out
    /// of range.
    pub fn edit_detector(&mut self, detector: Detector, aggregation: Aggregation, field: Field, index: usize) -> bool {
        let entry = DetectorEntry::new(detector, aggregation, field);
        if !self.detectors.replace(index, entry) {
            warn!(index, len = self.detectors.len(), "edit of missing detector ignored");
            return false;
        }
        self.detectors.apply_sparse_data(self.sparse_data);
        self.sync_detectors();
        true
    }

    /// Remove the detector at `index`; out of range is a no-op
    pub fn remove_detector(&mut self, index: usize) {
        if self.detectors.remove(index).is_some() {
            self.sync_detectors();
        }
    }

    /// Remove every detector
    pub fn remove_all_detectors(&mut self) {
        self.detectors.clear();
        self.sync_detectors();
    }

    fn sync_detectors(&mut self) {
        self.job_config.analysis_config.detectors = self.detectors.detectors();
    }

    /// Detectors as they will be submitted
    #[inline]
    #[must_use]
    pub fn detectors(&self) -> &[Detector] {
        &self.job_config.analysis_config.detectors
    }

    /// Detectors with their catalog entries and fields
    #[inline]
    #[must_use]
    pub fn detector_entries(&self) -> &[DetectorEntry] {
        self.detectors.entries()
    }

    /// Functions of the detectors, in order
    #[must_use]
    pub fn aggregations(&self) -> Vec<&Aggregation> {
        self.detectors.iter().map(|e| &e.aggregation).collect()
    }

    /// Fields of the detectors, in order
    #[must_use]
    pub fn fields(&self) -> Vec<&Field> {
        self.detectors.iter().map(|e| &e.field).collect()
    }

    /// Function of the detector at `index`
    #[must_use]
    pub fn aggregation(&self, index: usize) -> Option<&Aggregation> {
        self.detectors.get(index).map(|e| &e.aggregation)
    }

    /// Field of the detector at `index`
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.detectors.get(index).map(|e| &e.field)
    }

    /// Use sparse-aware count and sum functions
    pub fn set_sparse_data(&mut self, sparse_data: bool) {
        self.sparse_data = sparse_data;
        self.detectors.apply_sparse_data(sparse_data);
        self.sync_detectors();
    }

    /// Whether sparse-data variants are in use
    #[inline]
    #[must_use]
    pub fn sparse_data(&self) -> bool {
        self.sparse_data
    }

    // Job settings

    /// Set the bucket span; an unparsable span is stored with a length of 0
    pub fn set_bucket_span(&mut self, bucket_span: &str) {
        self.job_config.analysis_config.bucket_span = bucket_span.to_string();
        self.bucket_span_ms = interval_ms(bucket_span, true).unwrap_or_else(|| {
            debug!(bucket_span, "bucket span is not a valid interval");
            0
        });
    }

    /// Bucket span as written, e.g. `15m`
    #[inline]
    #[must_use]
    pub fn bucket_span(&self) -> &str {
        &self.job_config.analysis_config.bucket_span
    }

    /// Bucket span in milliseconds, 0 if unparsable
    #[inline]
    #[must_use]
    pub fn bucket_span_ms(&self) -> u64 {
        self.bucket_span_ms
    }

    /// Add an influencer unless already present
    pub fn add_influencer(&mut self, influencer: impl Into<String>) {
        let influencer = influencer.into();
        let influencers = &mut self.job_config.analysis_config.influencers;
        if !influencers.contains(&influencer) {
            influencers.push(influencer);
        }
    }

    /// Remove an influencer; unknown names are ignored
    pub fn remove_influencer(&mut self, influencer: &str) {
        self.job_config
            .analysis_config
            .influencers
            .retain(|i| i != influencer);
    }

    /// Remove every influencer
    pub fn remove_all_influencers(&mut self) {
        self.job_config.analysis_config.influencers.clear();
    }

    /// Influencers in insertion order
    #[inline]
    #[must_use]
    pub fn influencers(&self) -> &[String] {
        &self.job_config.analysis_config.influencers
    }

    /// Set the job id, and the datafeed and results index ids derived from it
    pub fn set_job_id(&mut self, job_id: &str) {
        self.job_config.job_id = job_id.to_string();
        self.datafeed_config.job_id = job_id.to_string();
        self.datafeed_config.datafeed_id = self.settings.datafeed_id(job_id);
        if self.use_dedicated_index {
            self.job_config.results_index_name = Some(job_id.to_string());
        }
    }

    /// Job id
    #[inline]
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_config.job_id
    }

    /// Datafeed id derived from the job id
    #[inline]
    #[must_use]
    pub fn datafeed_id(&self) -> &str {
        &self.datafeed_config.datafeed_id
    }

    /// Set the job description
    pub fn set_description(&mut self, description: &str) {
        self.job_config.description = Some(description.to_string());
    }

    /// Job description, empty if unset
    #[must_use]
    pub fn description(&self) -> &str {
        self.job_config.description.as_deref().unwrap_or_default()
    }

    /// Replace the job groups
    pub fn set_groups(&mut self, groups: Vec<String>) {
        self.job_config.groups = Some(groups);
    }

    /// Job groups, empty if unset
    #[must_use]
    pub fn groups(&self) -> &[String] {
        self.job_config.groups.as_deref().unwrap_or_default()
    }

    /// Calendars the job is added to after creation
    pub fn set_calendars(&mut self, calendars: Vec<Calendar>) {
        self.calendars = calendars;
    }

    /// Calendars the job will be added to
    #[inline]
    #[must_use]
    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    fn model_plot_config(&mut self) -> &mut ModelPlotConfig {
        self.job_config
            .model_plot_config
            .get_or_insert_with(|| ModelPlotConfig {
                enabled: Some(false),
                annotations_enabled: Some(false),
                ..ModelPlotConfig::default()
            })
    }

    /// Enable or disable model plot
    pub fn set_model_plot(&mut self, enabled: bool) {
        self.model_plot_config().enabled = Some(enabled);
    }

    /// Whether model plot is enabled
    #[must_use]
    pub fn model_plot(&self) -> bool {
        self.job_config
            .model_plot_config
            .as_ref()
            .and_then(|c| c.enabled)
            .unwrap_or(false)
    }

    /// Enable or disable model change annotations
    pub fn set_model_change_annotations(&mut self, enabled: bool) {
        self.model_plot_config().annotations_enabled = Some(enabled);
    }

    /// Whether model change annotations are enabled
    #[must_use]
    pub fn model_change_annotations(&self) -> bool {
        self.job_config
            .model_plot_config
            .as_ref()
            .and_then(|c| c.annotations_enabled)
            .unwrap_or(false)
    }

    /// Write results to an index named after the job
    ///
    /// Turning it on keeps an already set index name. Turning it off removes
    /// the name.
    pub fn set_use_dedicated_index(&mut self, enabled: bool) {
        self.use_dedicated_index = enabled;
        if enabled {
            if self.job_config.results_index_name.is_none() {
                self.job_config.results_index_name = Some(self.job_config.job_id.clone());
            }
        } else {
            self.job_config.results_index_name = None;
        }
    }

    /// Whether results go to a dedicated index
    #[inline]
    #[must_use]
    pub fn use_dedicated_index(&self) -> bool {
        self.use_dedicated_index
    }

    /// Set or clear the model memory limit
    ///
    /// Clearing the last analysis limit removes `analysis_limits` altogether.
    pub fn set_model_memory_limit(&mut self, limit: Option<&str>) {
        match limit {
            Some(limit) => {
                self.job_config
                    .analysis_limits
                    .get_or_insert_with(Default::default)
                    .model_memory_limit = Some(limit.to_string());
            }
            None => {
                if let Some(limits) = &mut self.job_config.analysis_limits {
                    limits.model_memory_limit = None;
                    if limits.is_empty() {
                        self.job_config.analysis_limits = None;
                    }
                }
            }
        }
    }

    /// Model memory limit, e.g. `64mb`
    #[must_use]
    pub fn model_memory_limit(&self) -> Option<&str> {
        self.job_config
            .analysis_limits
            .as_ref()
            .and_then(|l| l.model_memory_limit.as_deref())
    }

    /// Field holding pre-aggregated document counts
    pub fn set_summary_count_field_name(&mut self, name: Option<&str>) {
        self.job_config.analysis_config.summary_count_field_name = name.map(str::to_string);
    }

    /// Summary count field, `None` when unset or empty
    #[must_use]
    pub fn summary_count_field_name(&self) -> Option<&str> {
        self.job_config
            .analysis_config
            .summary_count_field_name
            .as_deref()
            .filter(|n| !n.is_empty())
    }

    /// Text field to categorize
    pub fn set_categorization_field_name(&mut self, name: Option<&str>) {
        self.job_config.analysis_config.categorization_field_name = name.map(str::to_string);
    }

    /// Categorization field, `None` when unset or empty
    #[must_use]
    pub fn categorization_field_name(&self) -> Option<&str> {
        self.job_config
            .analysis_config
            .categorization_field_name
            .as_deref()
            .filter(|n| !n.is_empty())
    }

    /// Add a categorization filter unless already present
    pub fn add_categorization_filter(&mut self, filter: &str) {
        let filters = self
            .job_config
            .analysis_config
            .categorization_filters
            .get_or_insert_with(Vec::new);
        if !filters.iter().any(|f| f == filter) {
            filters.push(filter.to_string());
        }
    }

    /// Remove a categorization filter; the list goes away once empty
    pub fn remove_categorization_filter(&mut self, filter: &str) {
        let config = &mut self.job_config.analysis_config;
        if let Some(filters) = &mut config.categorization_filters {
            filters.retain(|f| f != filter);
            if filters.is_empty() {
                config.categorization_filters = None;
            }
        }
    }

    /// Remove every categorization filter
    pub fn remove_categorization_filters(&mut self) {
        self.job_config.analysis_config.categorization_filters = None;
    }

    /// Regular expressions removed from text before categorization
    #[must_use]
    pub fn categorization_filters(&self) -> Option<&[String]> {
        self.job_config
            .analysis_config
            .categorization_filters
            .as_deref()
    }

    fn per_partition(&mut self) -> &mut PerPartitionCategorization {
        self.job_config
            .analysis_config
            .per_partition_categorization
            .get_or_insert(PerPartitionCategorization {
                enabled: Some(false),
                stop_on_warn: Some(false),
            })
    }

    /// Categorize per partition field value
    pub fn set_per_partition_categorization(&mut self, enabled: bool) {
        self.per_partition().enabled = Some(enabled);
    }

    /// Whether per-partition categorization is enabled
    #[must_use]
    pub fn per_partition_categorization(&self) -> bool {
        self.job_config
            .analysis_config
            .per_partition_categorization
            .and_then(|p| p.enabled)
            .unwrap_or(false)
    }

    /// Stop categorizing a partition once it is flagged as poorly categorized
    pub fn set_per_partition_stop_on_warn(&mut self, stop_on_warn: bool) {
        self.per_partition().stop_on_warn = Some(stop_on_warn);
    }

    /// Whether a warned partition stops categorizing
    #[must_use]
    pub fn per_partition_stop_on_warn(&self) -> bool {
        self.job_config
            .analysis_config
            .per_partition_categorization
            .and_then(|p| p.stop_on_warn)
            .unwrap_or(false)
    }

    /// Time field of the job's data description
    #[inline]
    #[must_use]
    pub fn time_field_name(&self) -> &str {
        &self.job_config.data_description.time_field
    }

    /// Set the time field
    pub fn set_time_field_name(&mut self, name: &str) {
        self.job_config.data_description.time_field = name.to_string();
    }

    /// Set the analysis window, epoch milliseconds
    pub fn set_time_range(&mut self, start: i64, end: i64) {
        self.start = start;
        self.end = end;
    }

    /// Start of the analysis window
    #[inline]
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// End of the analysis window
    #[inline]
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    // Datafeed settings

    /// Replace the datafeed query
    pub fn set_query(&mut self, query: JsonValue) {
        self.datafeed_config.query = query;
    }

    /// Datafeed query
    #[inline]
    #[must_use]
    pub fn query(&self) -> &JsonValue {
        &self.datafeed_config.query
    }

    /// Datafeed query delay, e.g. `90s`
    pub fn set_query_delay(&mut self, delay: Option<&str>) {
        self.datafeed_config.query_delay = delay.map(str::to_string);
    }

    /// Datafeed query delay
    #[must_use]
    pub fn query_delay(&self) -> Option<&str> {
        self.datafeed_config.query_delay.as_deref()
    }

    /// Datafeed search interval
    pub fn set_frequency(&mut self, frequency: Option<&str>) {
        self.datafeed_config.frequency = frequency.map(str::to_string);
    }

    /// Datafeed search interval
    #[must_use]
    pub fn frequency(&self) -> Option<&str> {
        self.datafeed_config.frequency.as_deref()
    }

    /// Documents per datafeed search
    pub fn set_scroll_size(&mut self, scroll_size: Option<u32>) {
        self.datafeed_config.scroll_size = scroll_size;
    }

    /// Documents per datafeed search, `None` for the cluster default
    #[inline]
    #[must_use]
    pub fn scroll_size(&self) -> Option<u32> {
        self.datafeed_config.scroll_size
    }

    /// Replace the indices the datafeed reads
    pub fn set_indices(&mut self, indices: Vec<String>) {
        self.datafeed_config.indices = indices;
    }

    /// Indices the datafeed reads
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[String] {
        &self.datafeed_config.indices
    }

    /// Skip missing or closed indices; false removes the option
    pub fn set_ignore_unavailable(&mut self, ignore: bool) {
        if ignore {
            self.datafeed_config
                .indices_options
                .get_or_insert_with(Default::default)
                .ignore_unavailable = Some(true);
        } else if let Some(options) = &mut self.datafeed_config.indices_options {
            options.ignore_unavailable = None;
            if options.is_empty() {
                self.datafeed_config.indices_options = None;
            }
        }
    }

    /// Whether missing or closed indices are skipped
    #[must_use]
    pub fn ignore_unavailable(&self) -> bool {
        self.datafeed_config
            .indices_options
            .as_ref()
            .and_then(|o| o.ignore_unavailable)
            .unwrap_or(false)
    }

    // Custom settings

    fn update_custom_settings(&mut self, update: impl FnOnce(&mut CustomSettings)) {
        let settings = self
            .job_config
            .custom_settings
            .get_or_insert_with(CustomSettings::default);
        update(settings);
        if settings.is_empty() {
            self.job_config.custom_settings = None;
        }
    }

    /// Set or clear the created-by label
    pub fn set_created_by(&mut self, created_by: Option<CreatedBy>) {
        self.update_custom_settings(|s| s.created_by = created_by);
    }

    /// Created-by label of the job
    #[must_use]
    pub fn created_by(&self) -> Option<&CreatedBy> {
        self.job_config
            .custom_settings
            .as_ref()
            .and_then(|s| s.created_by.as_ref())
    }

    /// Set or clear drill-down URLs
    pub fn set_custom_urls(&mut self, urls: Option<Vec<CustomUrl>>) {
        self.update_custom_settings(|s| s.custom_urls = urls);
    }

    /// Drill-down URLs
    #[must_use]
    pub fn custom_urls(&self) -> Option<&[CustomUrl]> {
        self.job_config
            .custom_settings
            .as_ref()
            .and_then(|s| s.custom_urls.as_deref())
    }

    // Derived fields

    fn populate_script_fields(&mut self) {
        self.script_fields = self
            .datafeed_config
            .script_fields
            .as_ref()
            .map(|fields| fields.keys().map(Field::script).collect())
            .unwrap_or_default();
    }

    fn populate_runtime_fields(&mut self) {
        self.runtime_fields = match &self.datafeed_config.runtime_mappings {
            Some(mappings) => {
                let fields = mappings
                    .iter()
                    .map(|(name, definition)| Field::runtime(name, definition.clone()))
                    .collect();
                combine_fields_and_aggs(fields, catalog()).fields
            }
            None => Vec::new(),
        };
    }

    fn populate_aggregation_fields(&mut self) {
        self.aggregation_fields = self
            .datafeed_config
            .datafeed_aggregations()
            .map(datafeed_aggregation_fields)
            .unwrap_or_default();
    }

    /// Script fields defined on the datafeed
    #[inline]
    #[must_use]
    pub fn script_fields(&self) -> &[Field] {
        &self.script_fields
    }

    /// Runtime mappings of the datafeed, before save-time filtering
    #[inline]
    #[must_use]
    pub fn runtime_mappings(&self) -> Option<&RuntimeMappings> {
        self.datafeed_config.runtime_mappings.as_ref()
    }

    /// Runtime fields as catalog fields
    #[inline]
    #[must_use]
    pub fn runtime_fields(&self) -> &[Field] {
        &self.runtime_fields
    }

    /// Fields produced by datafeed aggregations
    #[inline]
    #[must_use]
    pub fn aggregation_fields(&self) -> &[Field] {
        &self.aggregation_fields
    }

    /// Script, runtime and aggregation fields, in that order
    #[must_use]
    pub fn additional_fields(&self) -> Vec<Field> {
        self.script_fields
            .iter()
            .chain(&self.runtime_fields)
            .chain(&self.aggregation_fields)
            .cloned()
            .collect()
    }

    /// Every known field with the functions that apply to it
    #[must_use]
    pub fn available_fields(&self) -> FieldCapabilities {
        let mut fields = self.data_source.fields.clone();
        fields.extend(self.additional_fields());
        combine_fields_and_aggs(fields, catalog())
    }

    /// Look up a known field by id
    #[must_use]
    pub fn find_field(&self, id: &str) -> Option<Field> {
        if id == mlj_catalog::EVENT_RATE_FIELD_ID {
            return Some(Field::event_rate());
        }
        self.data_source
            .fields
            .iter()
            .chain(&self.runtime_fields)
            .chain(&self.script_fields)
            .chain(&self.aggregation_fields)
            .find(|f| f.id == id)
            .cloned()
    }

    fn resolve_field(&self, id: Option<&str>) -> Field {
        match id {
            None => Field::event_rate(),
            Some(id) => self
                .find_field(id)
                .unwrap_or_else(|| Field::new(id, FieldType::Unknown)),
        }
    }

    /// Drop unused runtime mappings when saving
    pub fn set_filter_runtime_mappings_on_save(&mut self, enabled: bool) {
        self.filter_runtime_mappings_on_save = enabled;
    }

    /// Whether unused runtime mappings are dropped on save
    #[inline]
    #[must_use]
    pub fn filter_runtime_mappings_on_save(&self) -> bool {
        self.filter_runtime_mappings_on_save
    }

    /// Runtime mappings that would be saved with the datafeed
    ///
    /// `None` when nothing would be saved.
    #[must_use]
    pub fn runtime_mappings_for_save(&self) -> Option<RuntimeMappings> {
        if !self.filter_runtime_mappings_on_save {
            return self.datafeed_config.runtime_mappings.clone();
        }
        let filtered = filter_runtime_mappings(&self.job_config, &self.datafeed_config);
        if !filtered.discarded_mappings.is_empty() {
            debug!(
                discarded = ?filtered.discarded_mappings.keys().collect::<Vec<_>>(),
                "dropping unused runtime mappings"
            );
        }
        (!filtered.runtime_mappings.is_empty()).then_some(filtered.runtime_mappings)
    }

    /// The datafeed exactly as [`create_datafeed`](Self::create_datafeed)
    /// submits it
    #[must_use]
    pub fn datafeed_for_submission(&self) -> DatafeedConfig {
        let job_id = self.job_config.job_id.clone();
        DatafeedConfig {
            datafeed_id: self.settings.datafeed_id(&job_id),
            job_id,
            runtime_mappings: self.runtime_mappings_for_save(),
            ..self.datafeed_config.clone()
        }
    }

    // Configs

    /// Job definition being built
    #[inline]
    #[must_use]
    pub fn job_config(&self) -> &JobConfig {
        &self.job_config
    }

    /// Datafeed definition being built
    #[inline]
    #[must_use]
    pub fn datafeed_config(&self) -> &DatafeedConfig {
        &self.datafeed_config
    }

    /// Pretty-printed job definition
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn formatted_job_json(&self) -> Result<String, CreatorError> {
        Ok(self.job_config.to_pretty_json()?)
    }

    /// Pretty-printed datafeed definition
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn formatted_datafeed_json(&self) -> Result<String, CreatorError> {
        Ok(self.datafeed_config.to_pretty_json()?)
    }

    /// Replace the job and datafeed with existing definitions
    ///
    /// Used when cloning or editing a job. Derived state (dedicated index,
    /// sparse data, field caches, detector entries) is rebuilt from the
    /// loaded definitions and the lifecycle starts over at `Draft`. The
    /// datafeed is re-pointed at the loaded job id.
    pub fn override_configs(&mut self, job: JobConfig, datafeed: DatafeedConfig) {
        self.job_config = job;
        self.datafeed_config = datafeed;

        if self.job_config.groups.is_none() {
            self.job_config.groups = Some(Vec::new());
        }

        let influencers = std::mem::take(&mut self.job_config.analysis_config.influencers);
        for influencer in influencers {
            self.add_influencer(influencer);
        }

        let dedicated = self
            .job_config
            .results_index_name
            .as_deref()
            .is_some_and(|name| self.settings.is_dedicated_index(name));
        if dedicated {
            self.set_use_dedicated_index(true);
        } else {
            self.use_dedicated_index = false;
        }

        self.bucket_span_ms = interval_ms(&self.job_config.analysis_config.bucket_span, true).unwrap_or(0);

        self.populate_script_fields();
        self.populate_runtime_fields();
        self.populate_aggregation_fields();

        let loaded = self.job_config.analysis_config.detectors.clone();
        self.sparse_data = loaded.iter().any(|d| is_sparse_variant(d.function));
        self.detectors.clear();
        for detector in loaded {
            let aggregation = *Aggregation::lookup(to_standard(detector.function));
            let field = self.resolve_field(detector.field_name.as_deref());
            self.detectors
                .push(DetectorEntry::new(detector, aggregation, field));
        }

        let job_id = self.job_config.job_id.clone();
        if self.datafeed_config.job_id != job_id {
            debug!(
                datafeed_job_id = %self.datafeed_config.job_id,
                job_id = %job_id,
                "re-pointing loaded datafeed at job"
            );
        }
        self.datafeed_config.job_id = job_id.clone();
        self.datafeed_config.datafeed_id = self.settings.datafeed_id(&job_id);

        self.lifecycle = JobLifecycle::Draft;
        info!(
            job_id = %self.job_config.job_id,
            detectors = self.detectors.len(),
            sparse_data = self.sparse_data,
            "loaded existing job"
        );
    }

    // Time range

    /// [`auto_set_time_range`](Self::auto_set_time_range) using the
    /// `exclude_frozen_data` setting
    ///
    /// # Errors
    /// `CreatorError::TimeRange` if the lookup fails
    pub async fn auto_set_time_range_default(&mut self) -> Result<(), CreatorError> {
        let exclude_frozen_data = self.settings.exclude_frozen_data;
        self.auto_set_time_range(exclude_frozen_data).await
    }

    /// Set the time range to the full extent of the data source
    ///
    /// # Errors
    /// `CreatorError::TimeRange` if the lookup fails
    pub async fn auto_set_time_range(&mut self, exclude_frozen_data: bool) -> Result<(), CreatorError> {
        let query = if exclude_frozen_data {
            add_exclude_frozen_to_query(Some(&self.datafeed_config.query))
        } else {
            self.datafeed_config.query.clone()
        };
        let request = TimeFieldRangeRequest {
            index: self.index_pattern_title.clone(),
            time_field_name: self.time_field_name().to_string(),
            query,
            runtime_mappings: self.datafeed_config.runtime_mappings.clone(),
            indices_options: self.datafeed_config.indices_options.clone(),
        };
        let range = self
            .api
            .get_time_field_range(&request)
            .await
            .map_err(CreatorError::TimeRange)?;
        debug!(start = range.start, end = range.end, "time range discovered");
        self.set_time_range(range.start, range.end);
        Ok(())
    }

    // Submission

    /// Submission lifecycle
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &JobLifecycle {
        &self.lifecycle
    }

    /// Whether a failed submission left a job behind
    #[inline]
    #[must_use]
    pub fn orphaned_job(&self) -> bool {
        self.lifecycle.orphaned_job()
    }

    fn record_failure(&mut self, stage: SubmissionStage, err: &CreatorError, job_created: bool) {
        error!(job_id = %self.job_config.job_id, ?stage, "submission failed: {}", err);
        let failed = JobLifecycle::Failed {
            stage,
            reason: err.to_string(),
            job_created,
        };
        if let Err(e) = self.lifecycle.transition(failed) {
            warn!("failure not recorded: {}", e);
        }
    }

    /// Submit the job, then add it to every attached calendar in order
    ///
    /// Calendar updates stop at the first failure; earlier ones are kept.
    ///
    /// # Errors
    /// `InvalidState` outside `Draft`, `JobSubmission` if the job is
    /// rejected, `CalendarUpdate` if a calendar update fails
    pub async fn create_job(&mut self) -> Result<(), CreatorError> {
        self.lifecycle.check(LifecycleState::JobCreated)?;
        let job_id = self.job_config.job_id.clone();
        info!(job_id = %job_id, "creating job");

        if let Err(e) = self.api.add_job(&job_id, &self.job_config).await {
            let err = CreatorError::JobSubmission(e);
            self.record_failure(SubmissionStage::CreateJob, &err, false);
            return Err(err);
        }
        self.lifecycle.transition(JobLifecycle::JobCreated)?;

        if let Err(err) = self.update_calendars(&job_id).await {
            self.record_failure(SubmissionStage::UpdateCalendars, &err, true);
            return Err(err);
        }
        Ok(())
    }

    async fn update_calendars(&self, job_id: &str) -> Result<(), CreatorError> {
        for calendar in &self.calendars {
            self.calendar_service
                .assign_new_job_id(calendar, job_id)
                .await
                .map_err(|source| CreatorError::CalendarUpdate {
                    calendar_id: calendar.calendar_id.clone(),
                    source,
                })?;
            debug!(calendar_id = %calendar.calendar_id, job_id, "job added to calendar");
        }
        Ok(())
    }

    /// Submit the datafeed
    ///
    /// # Errors
    /// `InvalidState` unless the job was created, `DatafeedSubmission` if
    /// the datafeed is rejected
    pub async fn create_datafeed(&mut self) -> Result<(), CreatorError> {
        self.lifecycle.check(LifecycleState::DatafeedCreated)?;
        let datafeed = self.datafeed_for_submission();
        info!(datafeed_id = %datafeed.datafeed_id, "creating datafeed");

        if let Err(e) = self.api.add_datafeed(&datafeed.datafeed_id, &datafeed).await {
            let err = CreatorError::DatafeedSubmission(e);
            self.record_failure(SubmissionStage::CreateDatafeed, &err, true);
            return Err(err);
        }
        self.lifecycle.transition(JobLifecycle::DatafeedCreated)?;
        Ok(())
    }

    /// Open the job and start its datafeed
    ///
    /// # Errors
    /// `InvalidState` unless the datafeed was created, `DatafeedStart` if
    /// the job cannot be opened or the datafeed started
    pub async fn start_datafeed(&mut self) -> Result<JobRunner, CreatorError> {
        self.lifecycle.check(LifecycleState::Started)?;
        let mut runner = JobRunner::new(Arc::clone(&self.api), self);
        match runner.start_datafeed().await {
            Ok(_) => {
                self.lifecycle.transition(JobLifecycle::Started)?;
                Ok(runner)
            }
            Err(err) => {
                self.record_failure(SubmissionStage::StartDatafeed, &err, true);
                Err(err)
            }
        }
    }

    /// Create the job, create the datafeed, start it
    ///
    /// A failure at any step is returned as is. Nothing already created is
    /// deleted; see [`discard_orphaned_job`](Self::discard_orphaned_job).
    ///
    /// # Errors
    /// The error of the first failing step
    pub async fn create_and_start_job(&mut self) -> Result<JobRunner, CreatorError> {
        self.create_job().await?;
        self.create_datafeed().await?;
        self.start_datafeed().await
    }

    /// Delete a job left behind by a failed submission
    ///
    /// # Errors
    /// `InvalidState` when no job was left behind, `Cleanup` if deletion
    /// fails
    pub async fn discard_orphaned_job(&mut self) -> Result<(), CreatorError> {
        if !self.lifecycle.orphaned_job() {
            return Err(LifecycleError::NoOrphanedJob(self.lifecycle.state()).into());
        }
        let job_id = self.job_config.job_id.clone();
        warn!(job_id = %job_id, "deleting orphaned job");
        self.api
            .delete_job(&job_id)
            .await
            .map_err(CreatorError::Cleanup)?;
        self.lifecycle.transition(JobLifecycle::Draft)?;
        Ok(())
    }

    /// Return a failed creator to `Draft`
    ///
    /// # Errors
    /// `InvalidState` unless failed
    pub fn reset_lifecycle(&mut self) -> Result<(), CreatorError> {
        self.lifecycle.transition(JobLifecycle::Draft)?;
        Ok(())
    }

    /// Return a failed creator to the state before the failed step
    ///
    /// # Errors
    /// `InvalidState` unless failed
    pub fn resume_lifecycle(&mut self) -> Result<(), CreatorError> {
        let next = self
            .lifecycle
            .resume_state()
            .ok_or(LifecycleError::NotFailed(self.lifecycle.state()))?;
        self.lifecycle.transition(next)?;
        Ok(())
    }

    // Progress

    /// Receive progress of the next started datafeed
    pub fn subscribe_to_progress(&mut self, subscriber: impl Fn(i32) + Send + Sync + 'static) {
        self.subscribers.push(Arc::new(subscriber));
    }

    pub(crate) fn progress_subscribers(&self) -> &[ProgressSubscriber] {
        &self.subscribers
    }

    /// Stop every progress poll started from this creator
    pub fn force_stop_refresh_polls(&self) {
        debug!(job_id = %self.job_config.job_id, "stopping progress polls");
        self.stop_refresh_polls.stop();
    }

    /// Handle shared with every runner this creator starts
    #[inline]
    #[must_use]
    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop_refresh_polls
    }
}

impl std::fmt::Debug for JobCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCreator")
            .field("job_type", &self.job_type)
            .field("job_id", &self.job_config.job_id)
            .field("index_pattern_title", &self.index_pattern_title)
            .field("detectors", &self.detectors.len())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
