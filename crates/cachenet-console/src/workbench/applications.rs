use tracing::debug;

use cachenet_client::ConsoleApi;
use cachenet_topology::{
    ApplicationStatusRecord, InstallStatus, InstallationDiff, InstallationView, NodeId,
    SelectorCache, StagedInstallation, Topology, TopologyError, install_status,
    restage_installation, stage_install, stage_uninstall,
};

use super::submit::{SubmitOutcome, send_batches};
use crate::error::{ConsoleError, ConsoleResult, SubmitError};

/// Staged installs and removals, kept separately for every application.
///
/// Only deployed nodes take part. The selected application decides which
/// staged set edits, diffs and submissions apply to.
#[derive(Debug, Clone)]
pub struct ApplicationWorkbench {
    topology: Topology,
    applications: Vec<String>,
    statuses: Vec<ApplicationStatusRecord>,
    staged: SelectorCache<String, StagedInstallation>,
    view: Option<InstallationView>,
    open: bool,
}

impl ApplicationWorkbench {
    pub fn new(
        topology: &Topology,
        applications: impl IntoIterator<Item = String>,
        statuses: Vec<ApplicationStatusRecord>,
    ) -> Self {
        Self {
            topology: topology.deployed_subset(),
            applications: applications.into_iter().collect(),
            statuses,
            staged: SelectorCache::new(),
            view: None,
            open: true,
        }
    }

    /// Deployed nodes only.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn select(&mut self, application: &str) -> ConsoleResult<()> {
        if !self.applications.iter().any(|a| a == application) {
            return Err(ConsoleError::UnknownApplication(application.to_string()));
        }
        self.staged.get(&application.to_string());
        self.view = Some(InstallationView::from_records(application, &self.statuses));
        debug!(application, "selected application");
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.view.as_ref().map(InstallationView::application)
    }

    pub fn view(&self) -> Option<&InstallationView> {
        self.view.as_ref()
    }

    /// Staged edits of the selected application.
    pub fn staged(&self) -> Option<&StagedInstallation> {
        let application = self.selected()?.to_string();
        self.staged.peek(&application)
    }

    /// Applications that have unsubmitted edits.
    pub fn pending_applications(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .staged
            .keys()
            .filter(|k| self.staged.peek(k).is_some_and(|s| !s.is_empty()))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn status(&self, node: NodeId) -> Option<InstallStatus> {
        let view = self.view.as_ref()?;
        let staged = self.staged()?;
        Some(install_status(view, staged, node))
    }

    /// Move to newer state. Every application's staged edits are replayed
    /// against it; the ones that no longer pass are dropped and returned
    /// with their application name.
    pub fn refresh(
        &mut self,
        topology: &Topology,
        statuses: Vec<ApplicationStatusRecord>,
    ) -> Vec<(String, TopologyError)> {
        self.topology = topology.deployed_subset();
        self.statuses = statuses;

        let mut dropped = Vec::new();
        let applications: Vec<String> = self.staged.keys().cloned().collect();
        for application in applications {
            let view = InstallationView::from_records(&application, &self.statuses);
            let Some(staged) = self.staged.peek(&application) else {
                continue;
            };
            let (next, errors) = restage_installation(&self.topology, &view, staged);
            dropped.extend(errors.into_iter().map(|e| (application.clone(), e)));
            self.staged.set(application, next);
        }

        if let Some(application) = self.selected().map(str::to_string) {
            self.view = Some(InstallationView::from_records(&application, &self.statuses));
        }
        dropped
    }

    pub fn install(&mut self, node: NodeId) -> ConsoleResult<()> {
        self.edit(|topology, view, staged| stage_install(topology, view, staged, node))?;
        debug!(node, "staged install");
        Ok(())
    }

    pub fn uninstall(&mut self, node: NodeId) -> ConsoleResult<()> {
        self.edit(|topology, view, staged| stage_uninstall(topology, view, staged, node))?;
        debug!(node, "staged uninstall");
        Ok(())
    }

    fn edit<F>(&mut self, op: F) -> ConsoleResult<()>
    where
        F: FnOnce(
            &Topology,
            &InstallationView,
            &StagedInstallation,
        ) -> Result<StagedInstallation, TopologyError>,
    {
        let view = self.view.as_ref().ok_or(ConsoleError::NoApplicationSelected)?;
        let key = view.application().to_string();
        let next = op(&self.topology, view, self.staged.get(&key))?;
        self.staged.set(key, next);
        Ok(())
    }

    /// Discard the selected application's edits.
    pub fn reset(&mut self) {
        if let Some(application) = self.selected().map(str::to_string) {
            self.staged.reset(&application);
        }
    }

    pub fn diff(&self) -> InstallationDiff {
        self.staged().map(InstallationDiff::from).unwrap_or_default()
    }

    /// Submit the selected application's removals and installs
    /// concurrently. Accepted halves are cleared; the workbench closes
    /// once both are accepted.
    pub async fn submit(&mut self, api: &dyn ConsoleApi) -> Result<SubmitOutcome, SubmitError> {
        if !self.open {
            return Err(SubmitError::Closed);
        }
        let Some(application) = self.selected().map(str::to_string) else {
            return Err(SubmitError::NoChanges);
        };
        let diff = self.diff();
        if diff.is_empty() {
            return Err(SubmitError::NoChanges);
        }

        let removals = (!diff.removals.is_empty()).then(|| api.uninstall_application(&diff.removals));
        let additions = (!diff.installs.is_empty()).then(|| api.install_application(&diff.installs));
        let results = send_batches(removals, additions).await;

        let mut staged = self.staged.get(&application).clone();
        if matches!(results.removals, Some(Ok(()))) {
            staged.clear_removals();
        }
        if matches!(results.additions, Some(Ok(()))) {
            staged.clear_installs();
        }
        self.staged.set(application, staged);

        let outcome = results.finish(diff.removals.len(), diff.installs.len())?;
        self.open = false;
        Ok(outcome)
    }
}
