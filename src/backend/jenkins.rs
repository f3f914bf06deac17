//! Jenkins adapter for [`BuildBackend`], talking to the JSON remote API.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Build, BuildBackend, BuildCause, Job, SystemAccess};
use crate::core::config::AppConfig;
use crate::errors::BridgeError;

/// Characters escaped inside a single job-name path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// How many folder levels `list_buildable_jobs` descends into.
const FOLDER_DEPTH: usize = 3;

const BUILD_FIELDS: &str =
    "lastBuild[number,building,result],property[parameterDefinitions[name]]";

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    jobs: Vec<JobNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobNode {
    name: String,
    full_name: Option<String>,
    display_name: Option<String>,
    buildable: Option<bool>,
    last_build: Option<BuildNode>,
    #[serde(default)]
    property: Vec<PropertyNode>,
    #[serde(default)]
    jobs: Vec<JobNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyNode {
    #[serde(default)]
    parameter_definitions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BuildNode {
    number: u64,
    #[serde(default)]
    building: bool,
    result: Option<String>,
}

impl JobNode {
    fn into_job(self) -> Job {
        let full_name = self.full_name.unwrap_or_else(|| self.name.clone());
        let parameterized = self
            .property
            .iter()
            .any(|p| !p.parameter_definitions.is_empty());
        Job {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            full_name,
            last_build: self.last_build.map(|b| Build {
                number: b.number,
                building: b.building,
                result: b.result,
            }),
            parameterized,
        }
    }

    /// Depth-first flattening that keeps catalog order.
    fn collect_buildable(mut self, out: &mut Vec<Job>) {
        let children = std::mem::take(&mut self.jobs);
        if self.buildable == Some(true) {
            out.push(self.into_job());
        }
        for child in children {
            child.collect_buildable(out);
        }
    }
}

/// `tree` query for the job catalog, descending `depth` folder levels.
fn jobs_tree(depth: usize) -> String {
    let mut fields = format!("name,fullName,displayName,buildable,{BUILD_FIELDS}");
    if depth > 1 {
        fields.push(',');
        fields.push_str(&jobs_tree(depth - 1));
    }
    format!("jobs[{fields}]")
}

/// Maps `team/api` to `job/team/job/api`.
fn job_path(full_name: &str) -> String {
    full_name
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("job/{}", utf8_percent_encode(segment, PATH_SEGMENT)))
        .collect::<Vec<_>>()
        .join("/")
}

pub struct JenkinsBackend {
    http: Client,
    base_url: String,
    user: Option<String>,
    api_token: Option<String>,
    build_token: Option<String>,
}

impl JenkinsBackend {
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        user: Option<String>,
        api_token: Option<String>,
    ) -> Result<Self, BridgeError> {
        Url::parse(base_url)
            .map_err(|e| BridgeError::ConfigError(format!("jenkins_url {base_url:?}: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            api_token,
            build_token: None,
        })
    }

    /// Sends `token` with every build request so Jenkins records the chat
    /// user as the build cause.
    #[must_use]
    pub fn with_build_token(mut self, token: Option<String>) -> Self {
        self.build_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// # Errors
    ///
    /// Returns an error if the configured Jenkins URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, BridgeError> {
        let backend = Self::new(
            &config.jenkins_url,
            config.jenkins_user.clone(),
            config.jenkins_api_token.clone(),
        )?
        .with_build_token(config.jenkins_build_token.clone());

        if backend.build_token.is_none() {
            warn!(
                "No jenkins_build_token set: builds will be credited to the API user, not the Slack user"
            );
        }
        Ok(backend)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, BridgeError> {
        let raw = if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        let mut url =
            Url::parse(&raw).map_err(|e| BridgeError::BackendError(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// `buildWithParameters` for parameterized jobs so their defaults apply;
    /// the cause is only honoured alongside the job's build token.
    fn trigger_url(&self, job: &Job, cause: &BuildCause) -> Result<Url, BridgeError> {
        let endpoint = if job.parameterized {
            "buildWithParameters"
        } else {
            "build"
        };
        let path = format!("{}/{endpoint}", job_path(&job.full_name));
        let description = cause.short_description();

        let mut query = vec![("delay", "0sec")];
        if let Some(token) = &self.build_token {
            query.push(("token", token.as_str()));
            query.push(("cause", description.as_str()));
        }
        self.url(&path, &query)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => request.basic_auth(user, self.api_token.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl BuildBackend for JenkinsBackend {
    async fn list_buildable_jobs(&self, access: &SystemAccess) -> Result<Vec<Job>, BridgeError> {
        let tree = jobs_tree(FOLDER_DEPTH);
        let url = self.url("api/json", &[("tree", tree.as_str())])?;
        debug!(purpose = access.purpose(), %url, "Listing Jenkins jobs");

        let resp = self.authorize(self.http.get(url)).send().await?;
        if !resp.status().is_success() {
            return Err(BridgeError::BackendError(format!(
                "job listing HTTP {}",
                resp.status()
            )));
        }
        let catalog: Catalog = resp.json().await?;

        let mut jobs = Vec::new();
        for node in catalog.jobs {
            node.collect_buildable(&mut jobs);
        }
        Ok(jobs)
    }

    async fn find_job_by_full_name(
        &self,
        access: &SystemAccess,
        full_name: &str,
    ) -> Result<Option<Job>, BridgeError> {
        let path = job_path(full_name);
        if path.is_empty() {
            return Ok(None);
        }
        let tree = format!("name,fullName,displayName,buildable,{BUILD_FIELDS}");
        let url = self.url(&format!("{path}/api/json"), &[("tree", tree.as_str())])?;
        debug!(purpose = access.purpose(), %url, "Looking up Jenkins job");

        let resp = self.authorize(self.http.get(url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(BridgeError::BackendError(format!(
                "job lookup HTTP {}",
                resp.status()
            )));
        }
        let node: JobNode = resp.json().await?;
        let job = node.into_job();

        // Jenkins resolves some aliases; only an exact full-name match counts.
        Ok((job.full_name == full_name).then_some(job))
    }

    async fn schedule_build(
        &self,
        access: &SystemAccess,
        job: &Job,
        cause: &BuildCause,
    ) -> Result<bool, BridgeError> {
        let url = self.trigger_url(job, cause)?;
        debug!(purpose = access.purpose(), %url, "Scheduling Jenkins build");

        let resp = self.authorize(self.http.post(url)).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }
        warn!(
            "Jenkins refused to schedule {}: HTTP {}",
            job.full_name, status
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_path_nests_folders_and_escapes() {
        assert_eq!(job_path("widget-ci"), "job/widget-ci");
        assert_eq!(job_path("team/widget ci"), "job/team/job/widget%20ci");
        assert_eq!(job_path(""), "");
    }

    #[test]
    fn test_jobs_tree_depth() {
        assert_eq!(
            jobs_tree(1),
            "jobs[name,fullName,displayName,buildable,lastBuild[number,building,result],\
             property[parameterDefinitions[name]]]"
        );
        assert!(jobs_tree(2).contains(",jobs[name,"));
    }

    #[test]
    fn test_catalog_flattening_keeps_order_and_skips_folders() {
        let raw = r#"{
            "jobs": [
                {"_class": "folder", "name": "team", "fullName": "team", "displayName": "Team",
                 "jobs": [
                    {"name": "api", "fullName": "team/api", "displayName": "API",
                     "buildable": true, "lastBuild": {"number": 7, "building": false, "result": "SUCCESS"}}
                 ]},
                {"name": "widget-ci", "fullName": "widget-ci", "displayName": "Widget CI",
                 "buildable": true, "lastBuild": null},
                {"name": "old", "fullName": "old", "displayName": "Old", "buildable": false}
            ]
        }"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        let mut jobs = Vec::new();
        for node in catalog.jobs {
            node.collect_buildable(&mut jobs);
        }

        let names: Vec<&str> = jobs.iter().map(|j| j.full_name.as_str()).collect();
        assert_eq!(names, vec!["team/api", "widget-ci"]);
        assert_eq!(jobs[0].last_build.as_ref().unwrap().number, 7);
        assert!(jobs[1].last_build.is_none());
    }

    #[test]
    fn test_url_appends_query() {
        let backend = JenkinsBackend::new("http://ci.example.com/", None, None).unwrap();
        let url = backend
            .url("job/widget-ci/build", &[("delay", "0sec")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://ci.example.com/job/widget-ci/build?delay=0sec"
        );
    }

    fn widget(parameterized: bool) -> Job {
        Job {
            name: "widget-ci".to_string(),
            full_name: "widget-ci".to_string(),
            display_name: "Widget CI".to_string(),
            last_build: None,
            parameterized,
        }
    }

    #[test]
    fn test_trigger_url_carries_token_and_cause() {
        let backend = JenkinsBackend::new("http://ci.example.com", None, None)
            .unwrap()
            .with_build_token(Some("s3cret".to_string()));
        let url = backend
            .trigger_url(&widget(false), &BuildCause::from_chat_user("bob"))
            .unwrap();

        assert_eq!(url.path(), "/job/widget-ci/build");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("token".to_string(), "s3cret".to_string())));
        assert!(query.contains(&(
            "cause".to_string(),
            "Build started by Slack user @bob via buildbridge".to_string()
        )));
    }

    #[test]
    fn test_trigger_url_without_token_omits_cause() {
        let backend = JenkinsBackend::new("http://ci.example.com", None, None)
            .unwrap()
            .with_build_token(Some("  ".to_string()));
        let url = backend
            .trigger_url(&widget(false), &BuildCause::from_chat_user("bob"))
            .unwrap();
        assert_eq!(url.query(), Some("delay=0sec"));
    }

    #[test]
    fn test_parameterized_job_uses_defaults_endpoint() {
        let backend = JenkinsBackend::new("http://ci.example.com", None, None).unwrap();
        let url = backend
            .trigger_url(&widget(true), &BuildCause::from_chat_user("bob"))
            .unwrap();
        assert_eq!(url.path(), "/job/widget-ci/buildWithParameters");
    }

    #[test]
    fn test_parameter_definitions_mark_job_parameterized() {
        let raw = r#"{
            "name": "deploy", "fullName": "deploy", "buildable": true,
            "property": [
                {"_class": "jenkins.model.BuildDiscarderProperty"},
                {"_class": "hudson.model.ParametersDefinitionProperty",
                 "parameterDefinitions": [{"name": "TARGET"}]}
            ]
        }"#;
        let node: JobNode = serde_json::from_str(raw).unwrap();
        assert!(node.into_job().parameterized);

        let plain: JobNode =
            serde_json::from_str(r#"{"name": "docs", "property": [{}]}"#).unwrap();
        assert!(!plain.into_job().parameterized);
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            JenkinsBackend::new("not a url", None, None),
            Err(BridgeError::ConfigError(_))
        ));
    }
}
