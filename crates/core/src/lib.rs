pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use errors::CoreError;
use models::account::Account;
use models::analytics::{AccountOverview, HoldingRow, HoldingsView, SummaryOverview, WatchRow};
use models::cache::ResponseCache;
use models::fund::{FundBrief, FundDetail, FundQuote};
use models::holding::Holding;
use models::market::IndexQuote;
use models::news::NewsItem;
use models::sector::{SectorFund, SectorOverview};
use models::settings::Settings;
use models::sort::{sort_rows_by, HoldingField, SectorField, SortState, WatchField};
use models::state::AppState;
use models::watchlist::WatchEntry;
use providers::eastmoney::EastmoneyClient;
use providers::sector::{SectorListSource, SectorStreakSource};
use providers::traits::UpstreamSource;
use services::data_gateway::{DataGateway, SharedCache};
use services::portfolio_service::PortfolioService;
use services::tasks::TaskSlot;
use storage::keys;
use storage::store::Store;

/// Main entry point for the Fund Tracker core library.
///
/// Holds the user's durable state (accounts, holdings, watchlist, search
/// history, name hints, empty-sector set), the request gateway with its
/// response cache, and the services that derive views from live market
/// data. Every state mutation persists the affected piece immediately;
/// persistence failures degrade to in-memory-only operation with a warning.
#[must_use]
pub struct FundTracker {
    state: AppState,
    store: Store,
    settings: Settings,
    gateway: Arc<DataGateway>,
    portfolio: PortfolioService,
    search_tasks: TaskSlot,
    detail_tasks: TaskSlot,
    holding_sort: SortState<HoldingField>,
    watch_sort: SortState<WatchField>,
    sector_sort: SortState<SectorField>,
}

impl std::fmt::Debug for FundTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundTracker")
            .field("accounts", &self.state.accounts.len())
            .field("watchlist", &self.state.watchlist.len())
            .field("cached_responses", &self.gateway.cache().len())
            .field("name_hints", &self.state.name_hints.len())
            .finish()
    }
}

impl FundTracker {
    /// Open (or initialize) a tracker backed by files under `data_dir`,
    /// with settings from the environment and the default direct-upstream
    /// sources registered.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Self::with_settings(data_dir, Settings::from_env())
    }

    /// Like [`open`](Self::open) with explicit settings.
    pub fn with_settings(
        data_dir: impl Into<PathBuf>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        let store = Store::open(data_dir)?;
        Self::build(store, settings, None)
    }

    /// Assemble a tracker from explicit parts. The given sources replace
    /// the default direct-upstream chain (pass an empty vec for
    /// backend-only operation).
    pub fn with_parts(
        store: Store,
        settings: Settings,
        sources: Vec<Box<dyn UpstreamSource>>,
    ) -> Result<Self, CoreError> {
        Self::build(store, settings, Some(sources))
    }

    fn build(
        store: Store,
        settings: Settings,
        sources: Option<Vec<Box<dyn UpstreamSource>>>,
    ) -> Result<Self, CoreError> {
        let mut cache_data: ResponseCache = store.load_or_default(keys::RESPONSE_CACHE);
        cache_data.set_cap(settings.cache_cap);
        let cache = SharedCache::new(cache_data, store.clone());

        let sources = match sources {
            Some(sources) => sources,
            None => Self::default_sources(&settings, cache.clone())?,
        };
        let gateway = Arc::new(DataGateway::new(&settings, cache, sources)?);
        let state = AppState::load(&store);

        Ok(Self {
            state,
            store,
            settings,
            gateway,
            portfolio: PortfolioService::new(),
            search_tasks: TaskSlot::new(),
            detail_tasks: TaskSlot::new(),
            holding_sort: SortState::default(),
            watch_sort: SortState::default(),
            sector_sort: SortState::default(),
        })
    }

    /// The ordered default fallback chain: direct sector sources first,
    /// backend for everything else.
    fn default_sources(
        settings: &Settings,
        cache: SharedCache,
    ) -> Result<Vec<Box<dyn UpstreamSource>>, CoreError> {
        let client = Arc::new(EastmoneyClient::new(
            Duration::from_secs(settings.upstream_timeout_secs),
            settings.kline_depth,
        )?);
        Ok(vec![
            Box::new(SectorListSource::new(Arc::clone(&client))),
            Box::new(SectorStreakSource::new(
                client,
                cache,
                settings.streak_pool,
            )),
        ])
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The gateway's shared response cache.
    #[must_use]
    pub fn cache(&self) -> &SharedCache {
        self.gateway.cache()
    }

    // ── Accounts ────────────────────────────────────────────────────

    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.state.accounts
    }

    /// Create an account and return its generated id.
    pub fn add_account(&mut self, name: &str) -> Result<String, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("account name must not be empty".into()));
        }
        let account = Account::new(name);
        let id = account.id.clone();
        self.state.accounts.push(account);
        self.save_accounts();
        Ok(id)
    }

    pub fn rename_account(&mut self, id: &str, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("account name must not be empty".into()));
        }
        let idx = self.require_account(id)?;
        self.state.accounts[idx].name = name.to_string();
        self.save_accounts();
        Ok(())
    }

    /// Delete an account together with its holdings.
    pub fn remove_account(&mut self, id: &str) -> Result<(), CoreError> {
        let idx = self.require_account(id)?;
        self.state.accounts.remove(idx);
        self.state.holdings.remove(id);
        self.save_accounts();
        self.save_holdings();
        Ok(())
    }

    pub fn move_account_up(&mut self, id: &str) -> Result<(), CoreError> {
        let idx = self.require_account(id)?;
        if idx > 0 {
            self.state.accounts.swap(idx, idx - 1);
            self.save_accounts();
        }
        Ok(())
    }

    pub fn move_account_down(&mut self, id: &str) -> Result<(), CoreError> {
        let idx = self.require_account(id)?;
        if idx + 1 < self.state.accounts.len() {
            self.state.accounts.swap(idx, idx + 1);
            self.save_accounts();
        }
        Ok(())
    }

    // ── Holdings ────────────────────────────────────────────────────

    /// Stored holdings of one account, in user order.
    #[must_use]
    pub fn holdings_in(&self, account_id: &str) -> &[Holding] {
        self.state
            .holdings
            .get(account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Add or update a holding (upsert by fund code within the account).
    pub fn upsert_holding(
        &mut self,
        account_id: &str,
        code: &str,
        name: &str,
        amount: f64,
        profit: f64,
    ) -> Result<(), CoreError> {
        self.require_account(account_id)?;
        let holding = Holding {
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            amount,
            profit,
        };
        self.portfolio
            .upsert_holding(&mut self.state.holdings, account_id, holding)?;
        self.state.name_hints.learn(code.trim(), name.trim());
        self.save_holdings();
        self.save_name_hints();
        Ok(())
    }

    pub fn remove_holding(&mut self, account_id: &str, code: &str) -> Result<(), CoreError> {
        self.require_account(account_id)?;
        self.portfolio
            .remove_holding(&mut self.state.holdings, account_id, code)?;
        self.save_holdings();
        Ok(())
    }

    // ── Watchlist ───────────────────────────────────────────────────

    #[must_use]
    pub fn watchlist(&self) -> &[WatchEntry] {
        self.state.watchlist.entries()
    }

    #[must_use]
    pub fn is_watched(&self, code: &str) -> bool {
        self.state.watchlist.contains(code)
    }

    /// Add to the watchlist (front, unique by code). Returns whether the
    /// entry was newly added.
    pub fn add_to_watchlist(&mut self, code: &str, name: &str) -> bool {
        let added = self.state.watchlist.add(code, name);
        if added {
            self.state.name_hints.learn(code, name);
            self.save_watchlist();
            self.save_name_hints();
        }
        added
    }

    pub fn remove_from_watchlist(&mut self, code: &str) -> bool {
        let removed = self.state.watchlist.remove(code);
        if removed {
            self.save_watchlist();
        }
        removed
    }

    /// Flip watched status; returns whether the fund is now watched.
    pub fn toggle_watch(&mut self, code: &str, name: &str) -> bool {
        if self.is_watched(code) {
            self.remove_from_watchlist(code);
            false
        } else {
            self.add_to_watchlist(code, name);
            true
        }
    }

    // ── Search history, name hints, empty sectors ───────────────────

    #[must_use]
    pub fn search_history(&self) -> &[String] {
        self.state.search_history.entries()
    }

    pub fn clear_search_history(&mut self) {
        self.state.search_history.clear();
        self.save_search_history();
    }

    /// Best-effort name for a fund code, for rendering a title before the
    /// detail fetch resolves. Never authoritative.
    #[must_use]
    pub fn provisional_name(&self, code: &str) -> Option<String> {
        self.state.name_hints.hint(code).map(str::to_string)
    }

    #[must_use]
    pub fn is_sector_empty(&self, code: &str) -> bool {
        self.state.empty_sectors.contains(code)
    }

    /// Forget every confirmed-empty sector, re-enabling their discovery.
    pub fn clear_empty_sectors(&mut self) {
        self.state.empty_sectors.clear();
        self.save_empty_sectors();
    }

    // ── Sort state (session-transient) ──────────────────────────────

    pub fn select_holding_sort(&mut self, field: HoldingField) {
        self.holding_sort.select(field);
    }

    pub fn select_watch_sort(&mut self, field: WatchField) {
        self.watch_sort.select(field);
    }

    pub fn select_sector_sort(&mut self, field: SectorField) {
        self.sector_sort.select(field);
    }

    #[must_use]
    pub fn holding_sort(&self) -> SortState<HoldingField> {
        self.holding_sort
    }

    // ── Views ───────────────────────────────────────────────────────

    /// Per-account aggregation plus grand totals, from one batch quote
    /// fetch over every held code.
    pub async fn account_summary(&mut self, force: bool) -> SummaryOverview {
        let codes = self.all_held_codes();
        let quotes = self.batch_quotes(&codes, force).await;

        let mut summary = SummaryOverview::default();
        for account in &self.state.accounts {
            let held = self
                .state
                .holdings
                .get(&account.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let stats = self.portfolio.aggregate(held, &quotes);
            summary.total_asset += stats.asset;
            summary.total_day_profit += stats.day_profit;
            summary.accounts.push(AccountOverview {
                id: account.id.clone(),
                name: account.name.clone(),
                stats,
            });
        }
        summary
    }

    /// The holdings list for one account, or for all accounts merged by
    /// fund code (`None`). Rows carry live change and day profit and come
    /// back in the session sort order.
    pub async fn holdings_view(
        &mut self,
        account_id: Option<&str>,
        force: bool,
    ) -> Result<HoldingsView, CoreError> {
        let scoped: Vec<Holding> = match account_id {
            Some(id) => {
                self.require_account(id)?;
                self.state.holdings.get(id).cloned().unwrap_or_default()
            }
            None => self
                .portfolio
                .merge_all(&self.state.holdings, &self.state.accounts),
        };

        let codes: Vec<String> = scoped.iter().map(|h| h.code.clone()).collect();
        let quotes = self.batch_quotes(&codes, force).await;
        let stats = self.portfolio.aggregate(&scoped, &quotes);
        let mut rows = self
            .portfolio
            .enrich(&scoped, &quotes, &self.state.name_hints);

        let sort = self.holding_sort;
        match sort.field {
            HoldingField::DayProfit => sort_rows_by(&mut rows, sort.ascending, |r: &HoldingRow| r.day_profit),
            HoldingField::Amount => sort_rows_by(&mut rows, sort.ascending, |r: &HoldingRow| r.amount),
            HoldingField::Change => sort_rows_by(&mut rows, sort.ascending, |r: &HoldingRow| r.change),
        }
        Ok(HoldingsView { rows, stats })
    }

    /// Watchlist entries with their live change, in the session sort order.
    pub async fn watchlist_view(&mut self, force: bool) -> Vec<WatchRow> {
        let codes: Vec<String> = self
            .state
            .watchlist
            .entries()
            .iter()
            .map(|w| w.code.clone())
            .collect();
        let quotes = self.batch_quotes(&codes, force).await;

        let mut rows: Vec<WatchRow> = self
            .state
            .watchlist
            .entries()
            .iter()
            .map(|entry| WatchRow {
                code: entry.code.clone(),
                name: if entry.name.is_empty() {
                    self.state
                        .name_hints
                        .hint(&entry.code)
                        .unwrap_or(&entry.code)
                        .to_string()
                } else {
                    entry.name.clone()
                },
                change: quotes.get(&entry.code).map(FundQuote::change).unwrap_or(0.0),
            })
            .collect();

        let sort = self.watch_sort;
        match sort.field {
            WatchField::Change => sort_rows_by(&mut rows, sort.ascending, |r: &WatchRow| r.change),
            WatchField::Name => sort_rows_by(&mut rows, sort.ascending, |r: &WatchRow| r.name.clone()),
        }
        rows
    }

    /// Main market index quotes.
    pub async fn market_indices(&self, force: bool) -> Result<Vec<IndexQuote>, CoreError> {
        self.gateway
            .fetch("market", "indices", &[], force)
            .await
            .decode()
    }

    /// Hot fund list; names feed the hint map.
    pub async fn hot_funds(&mut self, force: bool) -> Result<Vec<FundBrief>, CoreError> {
        let resp = self.gateway.fetch("fund", "hot", &[], force).await;
        let hits: Vec<FundBrief> = resp.decode()?;
        self.learn_briefs(&hits);
        Ok(hits)
    }

    /// Market news feed.
    pub async fn fund_news(&self, force: bool) -> Result<Vec<NewsItem>, CoreError> {
        self.gateway.fetch("news", "list", &[], force).await.decode()
    }

    /// Type-ahead fund search.
    ///
    /// Each call cancels the previous in-flight search outright; a
    /// superseded call resolves to `Ok(None)` and must be discarded by
    /// the caller. A completed search records the keyword in the history
    /// and feeds the hint map.
    pub async fn search(&mut self, keyword: &str) -> Result<Option<Vec<FundBrief>>, CoreError> {
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let gateway = Arc::clone(&self.gateway);
        let kw = keyword.clone();
        let resp = match self
            .search_tasks
            .run(async move {
                gateway
                    .fetch("fund", "search", &[("keyword", kw.as_str())], false)
                    .await
            })
            .await
        {
            Some(resp) => resp,
            None => return Ok(None),
        };

        let hits: Vec<FundBrief> = resp.decode()?;
        self.state.search_history.push(&keyword);
        self.save_search_history();
        self.learn_briefs(&hits);
        Ok(Some(hits))
    }

    /// Full fund detail. Guarded like `search`: opening a newer detail
    /// view cancels the previous in-flight fetch (`Ok(None)`).
    pub async fn fund_detail(
        &mut self,
        code: &str,
        force: bool,
    ) -> Result<Option<FundDetail>, CoreError> {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(CoreError::Validation("fund code must not be empty".into()));
        }

        let gateway = Arc::clone(&self.gateway);
        let c = code.clone();
        let resp = match self
            .detail_tasks
            .run(async move {
                gateway
                    .fetch("fund", "detail", &[("code", c.as_str())], force)
                    .await
            })
            .await
        {
            Some(resp) => resp,
            None => return Ok(None),
        };

        let detail: FundDetail = resp.decode()?;
        if !detail.name.is_empty() {
            let code_key = if detail.code.is_empty() { &code } else { &detail.code };
            self.state.name_hints.learn(code_key, &detail.name);
            self.save_name_hints();
        }
        Ok(Some(detail))
    }

    /// Lightweight `fund/info` fetch to resolve a title ahead of the full
    /// detail load. Learned into the hint map.
    pub async fn prefetch_name(&mut self, code: &str) -> Result<Option<String>, CoreError> {
        let resp = self
            .gateway
            .fetch("fund", "info", &[("code", code)], false)
            .await;
        let quote: FundQuote = resp.decode()?;
        if quote.name.is_empty() {
            return Ok(None);
        }
        let code_key = if quote.code.is_empty() { code } else { &quote.code };
        self.state.name_hints.learn(code_key, &quote.name);
        self.save_name_hints();
        Ok(Some(quote.name))
    }

    /// The sector overview with streaks, confirmed-empty sectors filtered
    /// out, in the session sort order.
    pub async fn sector_overview(&mut self, force: bool) -> Result<Vec<SectorOverview>, CoreError> {
        let resp = self.gateway.fetch("sector", "streak", &[], force).await;
        let mut sectors: Vec<SectorOverview> = resp.decode()?;
        sectors.retain(|s| !self.state.empty_sectors.contains(&s.code));

        let sort = self.sector_sort;
        match sort.field {
            SectorField::ChangePercent => {
                sort_rows_by(&mut sectors, sort.ascending, |s: &SectorOverview| s.change_value())
            }
            SectorField::StreakDays => {
                sort_rows_by(&mut sectors, sort.ascending, |s: &SectorOverview| s.streak_days)
            }
        }
        Ok(sectors)
    }

    /// Constituent funds of a sector. An empty (but successful) answer is
    /// the terminal "no tracked membership" state: the sector is marked
    /// empty permanently and cached sector views are invalidated.
    pub async fn sector_funds(
        &mut self,
        code: &str,
        name: &str,
        force: bool,
    ) -> Result<Vec<SectorFund>, CoreError> {
        let resp = self
            .gateway
            .fetch("sector", "funds", &[("code", code), ("name", name)], force)
            .await;
        let funds: Vec<SectorFund> = resp.decode()?;
        if funds.is_empty() && self.state.empty_sectors.mark(code) {
            self.save_empty_sectors();
            let dropped = self.gateway.cache().invalidate_prefix("sector/");
            debug!(code, dropped, "sector confirmed empty; cached sector views invalidated");
        }
        Ok(funds)
    }

    // ── Internals ───────────────────────────────────────────────────

    /// One batch quote fetch for the given codes. Degrades to an empty
    /// map on any failure: views render with zero day-change rather than
    /// erroring out.
    async fn batch_quotes(&mut self, codes: &[String], force: bool) -> HashMap<String, FundQuote> {
        if codes.is_empty() {
            return HashMap::new();
        }
        let joined = codes.join(",");
        let resp = self
            .gateway
            .fetch("fund", "batch", &[("codes", joined.as_str())], force)
            .await;
        let quotes: Vec<FundQuote> = match resp.decode() {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(error = %e, "batch quotes unavailable; rendering without live data");
                return HashMap::new();
            }
        };

        let mut map = HashMap::with_capacity(quotes.len());
        let mut learned = false;
        for quote in quotes {
            if quote.code.is_empty() {
                continue;
            }
            if !quote.name.is_empty() {
                self.state.name_hints.learn(&quote.code, &quote.name);
                learned = true;
            }
            map.insert(quote.code.clone(), quote);
        }
        if learned {
            self.save_name_hints();
        }
        map
    }

    /// Every held fund code across all accounts, deduped, account order.
    fn all_held_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for account in &self.state.accounts {
            if let Some(list) = self.state.holdings.get(&account.id) {
                for holding in list {
                    if !codes.contains(&holding.code) {
                        codes.push(holding.code.clone());
                    }
                }
            }
        }
        codes
    }

    fn learn_briefs(&mut self, hits: &[FundBrief]) {
        let mut learned = false;
        for hit in hits {
            if !hit.code.is_empty() && !hit.name.is_empty() {
                self.state.name_hints.learn(&hit.code, &hit.name);
                learned = true;
            }
        }
        if learned {
            self.save_name_hints();
        }
    }

    fn require_account(&self, id: &str) -> Result<usize, CoreError> {
        self.state
            .accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))
    }

    fn save_accounts(&self) {
        self.store.save(keys::ACCOUNTS, &self.state.accounts);
    }

    fn save_holdings(&self) {
        self.store.save(keys::HOLDINGS, &self.state.holdings);
    }

    fn save_watchlist(&self) {
        self.store.save(keys::WATCHLIST, &self.state.watchlist);
    }

    fn save_search_history(&self) {
        self.store.save(keys::SEARCH_HISTORY, &self.state.search_history);
    }

    fn save_name_hints(&self) {
        self.store.save(keys::NAME_HINTS, &self.state.name_hints);
    }

    fn save_empty_sectors(&self) {
        self.store.save(keys::EMPTY_SECTORS, &self.state.empty_sectors);
    }
}
