//! Routes `VK_EXT_debug_utils` messages into `tracing`.

use crate::driver::{Driver, MessengerDesc};
use ash::vk;
use ash::vk::DebugUtilsMessageSeverityFlagsEXT;
use std::borrow::Cow;
use std::ffi;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Validation,
    Performance,
    Other,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::General => "general",
            Category::Validation => "validation",
            Category::Performance => "performance",
            Category::Other => "other",
        };
        f.write_str(name)
    }
}

impl Severity {
    pub fn from_flags(flags: DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Severity::Warning
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Severity::Info
        } else {
            Severity::Verbose
        }
    }

    /// Warnings and errors reach the user-visible log; everything else is trace.
    pub fn is_surfaced(self) -> bool {
        self >= Severity::Warning
    }
}

impl Category {
    pub fn from_flags(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            Category::Validation
        } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            Category::Performance
        } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL) {
            Category::General
        } else {
            Category::Other
        }
    }
}

/// Severities and categories the messenger subscribes to.
pub fn messenger_desc() -> MessengerDesc {
    MessengerDesc {
        severity: DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | DebugUtilsMessageSeverityFlagsEXT::WARNING
            | DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
    }
}

fn emit(severity: Severity, category: Category, id_name: &str, id_number: i32, message: &str) {
    if !severity.is_surfaced() {
        tracing::trace!(%category, "[{id_name} ({id_number})]: {message}");
        return;
    }

    if severity == Severity::Error {
        tracing::error!(%category, "[{id_name} ({id_number})]: {message}")
    } else {
        tracing::warn!(%category, "[{id_name} ({id_number})]: {message}")
    }
}

/// Debug-utils callback. Never aborts the call that triggered it.
pub unsafe extern "system" fn vulkan_tracing_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    unsafe {
        let callback_data = *p_callback_data;
        let message_id_number = callback_data.message_id_number;

        let message_id_name = if callback_data.p_message_id_name.is_null() {
            Cow::from("")
        } else {
            ffi::CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
        };

        let message = if callback_data.p_message.is_null() {
            Cow::from("")
        } else {
            ffi::CStr::from_ptr(callback_data.p_message).to_string_lossy()
        };

        emit(
            Severity::from_flags(message_severity),
            Category::from_flags(message_type),
            &message_id_name,
            message_id_number,
            &message,
        );
    }

    vk::FALSE
}

/// Installs the standalone messenger. Returns `None` when diagnostics are off
/// or the debug-utils entry points did not resolve.
#[tracing::instrument(skip(driver))]
pub fn attach<D: Driver>(
    driver: &mut D,
    enabled: bool,
) -> crate::Result<Option<vk::DebugUtilsMessengerEXT>> {
    if !enabled {
        return Ok(None);
    }

    if !driver.debug_utils_supported() {
        tracing::warn!("VK_EXT_debug_utils is unsupported, running without a debug messenger");
        return Ok(None);
    }

    let messenger = driver
        .create_debug_messenger(&messenger_desc())
        .map_err(crate::InstanceError::FailedCreateDebugMessenger)?;
    tracing::info!("Created debug messenger");
    Ok(Some(messenger))
}

pub fn detach<D: Driver>(driver: &mut D, messenger: Option<vk::DebugUtilsMessengerEXT>) {
    if let Some(messenger) = messenger {
        driver.destroy_debug_messenger(messenger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{Kind, MockDriver, MockSystem};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[test]
    fn only_warnings_and_errors_are_surfaced() {
        assert!(!Severity::from_flags(DebugUtilsMessageSeverityFlagsEXT::VERBOSE).is_surfaced());
        assert!(!Severity::from_flags(DebugUtilsMessageSeverityFlagsEXT::INFO).is_surfaced());
        assert!(Severity::from_flags(DebugUtilsMessageSeverityFlagsEXT::WARNING).is_surfaced());
        assert!(Severity::from_flags(DebugUtilsMessageSeverityFlagsEXT::ERROR).is_surfaced());
    }

    struct Levels(Arc<Mutex<Vec<tracing::Level>>>);

    impl<S: tracing::Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    #[test]
    fn driver_messages_are_logged_at_matching_levels() {
        let levels = Arc::new(Mutex::new(vec![]));
        let subscriber = tracing_subscriber::registry().with(Levels(levels.clone()));
        tracing::subscriber::with_default(subscriber, || {
            for severity in [
                Severity::Verbose,
                Severity::Info,
                Severity::Warning,
                Severity::Error,
            ] {
                emit(severity, Category::Validation, "VUID-test", 7, "message");
            }
        });

        assert_eq!(
            *levels.lock().unwrap(),
            vec![
                tracing::Level::TRACE,
                tracing::Level::TRACE,
                tracing::Level::WARN,
                tracing::Level::ERROR,
            ]
        );
    }

    #[test]
    fn classifies_message_categories() {
        assert_eq!(
            Category::from_flags(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            Category::Validation
        );
        assert_eq!(
            Category::from_flags(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
            Category::Performance
        );
        assert_eq!(
            Category::from_flags(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL),
            Category::General
        );
    }

    #[test]
    fn callback_never_aborts() {
        let message = c"vkCreateDevice: something odd";
        let id_name = c"VUID-test";
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message_id_name: id_name.as_ptr(),
            p_message: message.as_ptr(),
            message_id_number: 7,
            ..Default::default()
        };

        for severity in [
            DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            DebugUtilsMessageSeverityFlagsEXT::WARNING,
            DebugUtilsMessageSeverityFlagsEXT::ERROR,
        ] {
            let result = unsafe {
                vulkan_tracing_callback(
                    severity,
                    vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                    &data,
                    std::ptr::null_mut(),
                )
            };
            assert_eq!(result, vk::FALSE);
        }

        let result = unsafe {
            vulkan_tracing_callback(
                DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn attach_is_a_no_op_when_disabled() {
        let mut driver = MockDriver::new(MockSystem::single_gpu());
        assert_eq!(attach(&mut driver, false).unwrap(), None);
        assert_eq!(driver.created(Kind::DebugMessenger), 0);
    }

    #[test]
    fn missing_debug_utils_is_not_fatal() {
        let mut system = MockSystem::single_gpu();
        system.debug_utils = false;
        let mut driver = MockDriver::new(system);
        assert_eq!(attach(&mut driver, true).unwrap(), None);
    }

    #[test]
    fn attach_then_detach_round_trips_the_messenger() {
        let mut driver = MockDriver::new(MockSystem::single_gpu());
        let messenger = attach(&mut driver, true).unwrap();
        assert!(messenger.is_some());
        detach(&mut driver, messenger);
        assert_eq!(driver.created(Kind::DebugMessenger), 1);
        assert_eq!(driver.destroyed(Kind::DebugMessenger), 1);
    }
}
