//! Installation proxy client: install, uninstall and look up applications.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{PlistError, Result};
use crate::progress::{classify, Progress};
use crate::service::{command, PlistService};
use crate::value::{Dictionary, Value};

/// Attributes of one installed application, as reported by `Lookup`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppRecord {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "CFBundleExecutable")]
    pub executable: String,
    #[serde(rename = "CFBundleIdentifier", default)]
    pub bundle_id: Option<String>,
}

impl AppRecord {
    /// On-device path of the application's main executable.
    pub fn executable_path(&self) -> String {
        format!("{}/{}", self.path, self.executable)
    }
}

/// Installation proxy commands over an open conversation.
pub struct InstallationProxy<'a, T> {
    service: &'a mut PlistService<T>,
}

impl<'a, T: Read + Write> InstallationProxy<'a, T> {
    pub fn new(service: &'a mut PlistService<T>) -> Self {
        Self { service }
    }

    /// Install the developer package staged at `package_path` on the device.
    ///
    /// `on_progress` sees every intermediate and final response.
    pub fn install<F>(&mut self, package_path: &str, on_progress: F) -> Result<()>
    where
        F: FnMut(&Dictionary),
    {
        let mut options = Dictionary::new();
        options.insert("PackageType".into(), "Developer".into());

        let mut request = command("Install");
        request.insert("PackagePath".into(), package_path.into());
        request.insert("ClientOptions".into(), options.into());
        self.run_with_progress("Install", &request, on_progress)?;
        info!(package_path, "package installed");
        Ok(())
    }

    /// Remove the application identified by `bundle_id`.
    pub fn uninstall<F>(&mut self, bundle_id: &str, on_progress: F) -> Result<()>
    where
        F: FnMut(&Dictionary),
    {
        let mut request = command("Uninstall");
        request.insert("ApplicationIdentifier".into(), bundle_id.into());
        self.run_with_progress("Uninstall", &request, on_progress)?;
        info!(bundle_id, "application uninstalled");
        Ok(())
    }

    /// All installed applications keyed by bundle identifier.
    pub fn lookup(&mut self) -> Result<BTreeMap<String, Dictionary>> {
        self.service.send(&command("Lookup"))?;
        let mut apps = BTreeMap::new();
        loop {
            let response = self.service.recv()?;
            if let Some(Value::Dictionary(result)) = response.get("LookupResult") {
                for (bundle_id, attributes) in result {
                    if let Value::Dictionary(attributes) = attributes {
                        apps.insert(bundle_id.clone(), attributes.clone());
                    }
                }
            }
            if classify("Lookup", &response)? == Progress::Complete {
                break;
            }
        }
        debug!(count = apps.len(), "application lookup complete");
        Ok(apps)
    }

    /// Typed record of the application identified by `bundle_id`.
    pub fn lookup_app(&mut self, bundle_id: &str) -> Result<AppRecord> {
        let apps = self.lookup()?;
        let attributes = apps
            .get(bundle_id)
            .ok_or_else(|| PlistError::NotFound(format!("{bundle_id} not found in app list")))?;
        Value::Dictionary(attributes.clone()).deserialize_into()
    }

    /// `"<Path>/<CFBundleExecutable>"` for `bundle_id`.
    pub fn lookup_executable(&mut self, bundle_id: &str) -> Result<String> {
        Ok(self.lookup_app(bundle_id)?.executable_path())
    }

    fn run_with_progress<F>(&mut self, name: &str, request: &Dictionary, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&Dictionary),
    {
        self.service.send(request)?;
        loop {
            let response = self.service.recv()?;
            let progress = classify(name, &response)?;
            on_progress(&response);
            if progress == Progress::Complete {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressReporter;
    use crate::service::testing::{dict, ScriptedChannel};

    fn app(path: &str, executable: &str) -> Value {
        Value::Dictionary(dict(&[
            ("Path", path.into()),
            ("CFBundleExecutable", executable.into()),
        ]))
    }

    #[test]
    fn install_reports_until_complete() {
        let replies = [
            dict(&[("Status", "CreatingStagingDirectory".into()), ("PercentComplete", 5i64.into())]),
            dict(&[("Status", "CopyingFile".into()), ("PercentComplete", 40i64.into())]),
            dict(&[("Status", "Complete".into())]),
        ];
        let mut service = PlistService::new(ScriptedChannel::new(&replies));
        let mut reporter = ProgressReporter::new(Vec::new());
        InstallationProxy::new(&mut service)
            .install("PublicStaging/App.app", |response| {
                reporter.report("Installing", response).unwrap();
            })
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            [
                "[Installing]   5% CreatingStagingDirectory",
                "[Installing]  40% CopyingFile",
                "[Installing] Complete",
            ]
        );

        let sent = service.into_inner().sent_documents();
        let options = sent[0].get("ClientOptions").unwrap();
        assert_eq!(options.get("PackageType"), Some(&Value::from("Developer")));
        assert_eq!(
            sent[0].get("PackagePath"),
            Some(&Value::from("PublicStaging/App.app"))
        );
    }

    #[test]
    fn uninstall_error_is_device_status() {
        let replies = [dict(&[
            ("Error", "APIInternalError".into()),
            ("ErrorDescription", "bundle not installed".into()),
        ])];
        let mut service = PlistService::new(ScriptedChannel::new(&replies));
        let mut seen = 0;
        let err = InstallationProxy::new(&mut service)
            .uninstall("com.example.app", |_| seen += 1)
            .unwrap_err();

        assert_eq!(seen, 0);
        assert!(matches!(err, PlistError::DeviceStatus { ref command, .. } if command == "Uninstall"));
    }

    #[test]
    fn unknown_shape_is_protocol_error() {
        let replies = [dict(&[("Unexpected", true.into())])];
        let mut service = PlistService::new(ScriptedChannel::new(&replies));
        let err = InstallationProxy::new(&mut service)
            .install("PublicStaging/App.app", |_| {})
            .unwrap_err();
        assert!(matches!(err, PlistError::Protocol(_)));
    }

    #[test]
    fn lookup_merges_batches() {
        let first: Dictionary = [("com.example.one".to_string(), app("/var/one.app", "One"))]
            .into_iter()
            .collect();
        let second: Dictionary = [("com.example.two".to_string(), app("/var/two.app", "Two"))]
            .into_iter()
            .collect();
        let replies = [
            dict(&[("Status", "BrowsingApplications".into()), ("LookupResult", first.into())]),
            dict(&[("Status", "BrowsingApplications".into()), ("LookupResult", second.into())]),
            dict(&[("Status", "Complete".into())]),
        ];
        let mut service = PlistService::new(ScriptedChannel::new(&replies));
        let apps = InstallationProxy::new(&mut service).lookup().unwrap();

        assert_eq!(
            apps.keys().collect::<Vec<_>>(),
            ["com.example.one", "com.example.two"]
        );
    }

    #[test]
    fn lookup_executable_joins_path() {
        let result: Dictionary = [("com.example.one".to_string(), app("/var/one.app", "One"))]
            .into_iter()
            .collect();
        let replies = [
            dict(&[("Status", "Complete".into()), ("LookupResult", result.clone().into())]),
            dict(&[("Status", "Complete".into()), ("LookupResult", result.into())]),
        ];
        let mut service = PlistService::new(ScriptedChannel::new(&replies));
        let mut proxy = InstallationProxy::new(&mut service);

        assert_eq!(
            proxy.lookup_executable("com.example.one").unwrap(),
            "/var/one.app/One"
        );
        assert!(matches!(
            proxy.lookup_executable("com.example.missing"),
            Err(PlistError::NotFound(_))
        ));
    }
}
