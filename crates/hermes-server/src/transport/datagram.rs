//! Unix datagram socket channel.
//!
//! Each bound scheme owns `<runtime_dir>/<scheme>.sock`. Only the owning
//! server reads from it; any local process may write one datagram per path.

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::geteuid;
use tracing::{debug, warn};

use hermes_config::{RuntimePaths, create_private_dir};

use crate::reporter::DispatchReporter;
use crate::scheme::Scheme;

use super::registrar::{HelperFailure, PendingRegistration, SchemeRegistrar};
use super::{MAX_MESSAGE_SIZE, TRANSPORT_TARGET, TransportChannel, TransportError};

/// Channel reading paths from a per-scheme unix datagram socket.
pub struct DatagramChannel {
    paths: RuntimePaths,
    registrar: SchemeRegistrar,
    reporter: Arc<dyn DispatchReporter>,
    bound: Option<BoundSocket>,
    registration: Option<PendingRegistration>,
    buffer: Vec<u8>,
}

struct BoundSocket {
    scheme: Scheme,
    socket: UnixDatagram,
    path: Utf8PathBuf,
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(self.path.as_std_path())
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                path = %self.path,
                "failed to remove channel socket"
            );
        }
    }
}

impl DatagramChannel {
    /// Builds an unbound channel.
    #[must_use]
    pub fn new(
        paths: RuntimePaths,
        registrar: SchemeRegistrar,
        reporter: Arc<dyn DispatchReporter>,
    ) -> Self {
        Self {
            paths,
            registrar,
            reporter,
            bound: None,
            registration: None,
            buffer: vec![0; MAX_MESSAGE_SIZE + 1],
        }
    }

    /// Socket path of the currently bound scheme.
    #[must_use]
    pub fn socket_path(&self) -> Option<&Utf8Path> {
        self.bound.as_ref().map(|bound| bound.path.as_path())
    }

    /// Reports whether a registration helper is still running.
    #[must_use]
    pub fn registration_in_flight(&self) -> bool {
        self.registration.is_some()
    }

    fn poll_registration(&mut self) {
        let Some(pending) = self.registration.as_mut() else {
            return;
        };
        let Some(outcome) = pending.try_finish() else {
            return;
        };
        let scheme = pending.scheme().clone();
        self.registration = None;
        self.report_registration(&scheme, outcome);
    }

    fn finish_registration(&mut self) {
        if let Some(pending) = self.registration.take() {
            let scheme = pending.scheme().clone();
            debug!(
                target: TRANSPORT_TARGET,
                scheme = %scheme,
                "waiting for in-flight registration"
            );
            let outcome = pending.wait();
            self.report_registration(&scheme, outcome);
        }
    }

    fn report_registration(&self, scheme: &Scheme, outcome: Result<(), HelperFailure>) {
        match outcome {
            Ok(()) => self.reporter.registration_succeeded(scheme),
            Err(failure) => self.reporter.registration_failed(scheme, &failure),
        }
    }

    fn open_socket(&self, scheme: &Scheme) -> Result<BoundSocket, TransportError> {
        create_private_dir(self.paths.runtime_dir())?;
        let path = self.paths.channel_path(scheme.as_str());
        remove_stale_socket(&path)?;

        let socket =
            UnixDatagram::bind(path.as_std_path()).map_err(|source| TransportError::Create {
                path: path.clone(),
                source,
            })?;
        // From here on dropping `bound` removes the socket file.
        let bound = BoundSocket {
            scheme: scheme.clone(),
            socket,
            path,
        };
        bound
            .socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking {
                path: bound.path.clone(),
                source,
            })?;
        fs::set_permissions(bound.path.as_std_path(), fs::Permissions::from_mode(0o600))
            .map_err(|source| TransportError::Permissions {
                path: bound.path.clone(),
                source,
            })?;
        grant_invoking_user(&bound.path, self.paths.runtime_dir())?;
        Ok(bound)
    }
}

impl TransportChannel for DatagramChannel {
    fn bind(&mut self, scheme: &Scheme) -> Result<(), TransportError> {
        if let Some(previous) = self.bound.take() {
            warn!(
                target: TRANSPORT_TARGET,
                previous = %previous.scheme,
                scheme = %scheme,
                "binding while another scheme is still bound; closing it"
            );
        }
        self.finish_registration();

        let bound = self.open_socket(scheme)?;
        self.registration = Some(self.registrar.spawn_register(scheme)?);
        debug!(
            target: TRANSPORT_TARGET,
            scheme = %scheme,
            path = %bound.path,
            "channel bound"
        );
        self.bound = Some(bound);
        Ok(())
    }

    fn unbind(&mut self, scheme: &Scheme) {
        self.finish_registration();
        if let Err(failure) = self.registrar.run_unregister(scheme) {
            self.reporter.unregistration_failed(scheme, &failure);
        }
        if self
            .bound
            .as_ref()
            .is_some_and(|bound| bound.scheme == *scheme)
        {
            self.bound = None;
        }
    }

    fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.poll_registration();
        let Some(bound) = self.bound.as_ref() else {
            return Ok(None);
        };
        match bound.socket.recv(&mut self.buffer) {
            Ok(length) if length > MAX_MESSAGE_SIZE => Err(TransportError::Oversized {
                limit: MAX_MESSAGE_SIZE,
            }),
            Ok(length) => Ok(self.buffer.get(..length).map(<[u8]>::to_vec)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(TransportError::Read { source }),
        }
    }

    fn shutdown(&mut self) {
        self.bound = None;
        self.finish_registration();
    }
}

fn remove_stale_socket(path: &Utf8Path) -> Result<(), TransportError> {
    let metadata = match fs::symlink_metadata(path.as_std_path()) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(TransportError::Metadata {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.file_type().is_socket() {
        return Err(TransportError::NotSocket {
            path: path.to_path_buf(),
        });
    }

    let probe = UnixDatagram::unbound().map_err(|source| TransportError::Probe {
        path: path.to_path_buf(),
        source,
    })?;
    match probe.connect(path.as_std_path()) {
        Ok(()) => Err(TransportError::InUse {
            path: path.to_path_buf(),
        }),
        Err(error)
            if error.kind() == io::ErrorKind::ConnectionRefused
                || error.kind() == io::ErrorKind::NotFound =>
        {
            fs::remove_file(path.as_std_path()).map_err(|source| TransportError::Cleanup {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(TransportError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Hands the channel to the invoking user when running elevated through sudo,
/// so their unprivileged helper can still write to it.
fn grant_invoking_user(socket: &Utf8Path, runtime_dir: &Utf8Path) -> Result<(), TransportError> {
    if !geteuid().is_root() {
        return Ok(());
    }
    let Some((uid, gid)) = sudo_ids() else {
        return Ok(());
    };
    for path in [runtime_dir, socket] {
        std::os::unix::fs::chown(path.as_std_path(), Some(uid), Some(gid)).map_err(|source| {
            TransportError::Permissions {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    Ok(())
}

fn sudo_ids() -> Option<(u32, u32)> {
    let uid = env::var("SUDO_UID").ok()?.parse().ok()?;
    let gid = env::var("SUDO_GID").ok()?.parse().ok()?;
    Some((uid, gid))
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use hermes_config::Config;

    use super::*;
    use crate::reporter::StructuredReporter;

    struct Fixture {
        _dir: TempDir,
        channel: DatagramChannel,
        base: Utf8PathBuf,
    }

    fn fixture(helper_body: &str) -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let helper = base.join("helper.sh");
        fs::write(helper.as_std_path(), format!("#!/bin/sh\n{helper_body}\n"))
            .expect("write helper");
        fs::set_permissions(helper.as_std_path(), fs::Permissions::from_mode(0o755))
            .expect("chmod helper");
        let config = Config {
            runtime_dir: Some(base.join("run")),
            state_path: Some(base.join("conf/state.json")),
            ..Config::default()
        };
        let paths = RuntimePaths::derive(&config).expect("derive paths");
        let channel = DatagramChannel::new(
            paths,
            SchemeRegistrar::new(helper, Vec::new()),
            Arc::new(StructuredReporter::new()),
        );
        Fixture {
            _dir: dir,
            channel,
            base,
        }
    }

    fn scheme(name: &str) -> Scheme {
        Scheme::sanitize(name).expect("valid scheme")
    }

    fn poll_until_message(channel: &mut DatagramChannel) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(message) = channel.poll().expect("poll channel") {
                return message;
            }
            assert!(Instant::now() < deadline, "no message arrived");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn delivers_datagrams_to_the_bound_scheme() {
        let Fixture {
            _dir,
            mut channel,
            base,
        } = fixture("exit 0");
        channel.bind(&scheme("hue4")).expect("bind channel");
        let path = base.join("run/hue4.sock");
        assert_eq!(channel.socket_path(), Some(path.as_path()));

        let mode = fs::metadata(path.as_std_path())
            .expect("socket metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);

        let sender = UnixDatagram::unbound().expect("sender socket");
        sender
            .send_to(b"/content/Game/Map", path.as_std_path())
            .expect("send datagram");
        assert_eq!(poll_until_message(&mut channel), b"/content/Game/Map");
        assert!(channel.poll().expect("poll channel").is_none());
    }

    #[test]
    fn oversized_datagrams_are_rejected_not_truncated() {
        let Fixture {
            _dir,
            mut channel,
            base,
        } = fixture("exit 0");
        channel.bind(&scheme("hue4")).expect("bind channel");
        let path = base.join("run/hue4.sock");
        let sender = UnixDatagram::unbound().expect("sender socket");

        let mut oversized = b"/content/".to_vec();
        oversized.resize(MAX_MESSAGE_SIZE + 1, b'a');
        sender
            .send_to(&oversized, path.as_std_path())
            .expect("send oversized datagram");
        let deadline = Instant::now() + Duration::from_secs(5);
        let error = loop {
            match channel.poll() {
                Ok(None) => {
                    assert!(Instant::now() < deadline, "no message arrived");
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(Some(message)) => panic!("delivered {} bytes", message.len()),
                Err(error) => break error,
            }
        };
        assert!(matches!(
            error,
            TransportError::Oversized {
                limit: MAX_MESSAGE_SIZE
            }
        ));

        let mut largest = b"/content/".to_vec();
        largest.resize(MAX_MESSAGE_SIZE, b'b');
        sender
            .send_to(&largest, path.as_std_path())
            .expect("send largest datagram");
        assert_eq!(poll_until_message(&mut channel).len(), MAX_MESSAGE_SIZE);
    }

    #[test]
    fn unbind_removes_the_socket() {
        let Fixture {
            _dir,
            mut channel,
            base,
        } = fixture("exit 0");
        channel.bind(&scheme("hue4")).expect("bind channel");
        channel.unbind(&scheme("hue4"));
        assert!(!base.join("run/hue4.sock").as_std_path().exists());
        assert!(!channel.registration_in_flight());
        assert!(channel.poll().expect("poll unbound").is_none());
    }

    #[test]
    fn stale_socket_is_replaced() {
        let Fixture {
            _dir,
            mut channel,
            base,
        } = fixture("exit 0");
        create_private_dir(&base.join("run")).expect("runtime dir");
        let stale_path = base.join("run/hue4.sock");
        drop(UnixDatagram::bind(stale_path.as_std_path()).expect("stale socket"));
        assert!(stale_path.as_std_path().exists());

        channel.bind(&scheme("hue4")).expect("bind over stale socket");
    }

    #[test]
    fn live_socket_is_reported_in_use() {
        let Fixture {
            _dir,
            mut channel,
            base,
        } = fixture("exit 0");
        create_private_dir(&base.join("run")).expect("runtime dir");
        let _owner = UnixDatagram::bind(base.join("run/hue4.sock").as_std_path())
            .expect("owner socket");

        let error = channel.bind(&scheme("hue4")).expect_err("socket is owned");
        assert!(matches!(error, TransportError::InUse { .. }));
    }

    #[test]
    fn missing_helper_fails_the_bind_and_closes_the_socket() {
        let Fixture {
            _dir,
            channel,
            base,
        } = fixture("exit 0");
        let mut channel = DatagramChannel::new(
            channel.paths.clone(),
            SchemeRegistrar::new(base.join("absent"), Vec::new()),
            Arc::new(StructuredReporter::new()),
        );
        let error = channel.bind(&scheme("hue4")).expect_err("helper missing");
        assert!(matches!(error, TransportError::SpawnHelper { .. }));
        assert!(channel.socket_path().is_none());
        assert!(!base.join("run/hue4.sock").as_std_path().exists());
    }
}
