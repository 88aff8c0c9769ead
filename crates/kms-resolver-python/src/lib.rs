//! Python bindings for KMS Resolver via PyO3
//!
//! The host's stack object supplies `name`, `profile`, `region` and a
//! `connection_manager` whose `call(service=..., command=..., kwargs=...,
//! profile=..., region=...)` performs the remote request.

use std::sync::{Arc, Mutex, PoisonError};

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyKeyError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyString};

use kms_resolver_core::connection::{
    CallError, CallResult, ConnectionManager, ParamValue, ServiceCall, ServiceResponse,
};
use kms_resolver_core::logging::{Logger, SharedLogger};
use kms_resolver_core::resolver::{list_resolvers as core_list_resolvers, KmsResolver as CoreKmsResolver, Resolver};
use kms_resolver_core::{ResolverError, Stack};

create_exception!(
    kms_resolver,
    ParameterNotFoundError,
    PyException,
    "The referenced KMS key or parameter does not exist."
);

// ============================================================================
// Connection Manager
// ============================================================================

/// Adapts the host's Python connection manager to the core trait
///
/// The last Python exception raised by the host is kept so it can be
/// re-raised unchanged once the core hands the failure back.
struct PyConnectionManager {
    inner: Py<PyAny>,
    raised: Mutex<Option<PyErr>>,
}

impl PyConnectionManager {
    fn new(inner: Py<PyAny>) -> Self {
        Self { inner, raised: Mutex::new(None) }
    }

    fn take_raised(&self) -> Option<PyErr> {
        self.raised.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn clear_raised(&self) {
        self.take_raised();
    }

    fn remember(&self, err: PyErr) {
        *self.raised.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    fn call_error(&self, py: Python<'_>, err: PyErr) -> CallError {
        let call_error = if err.is_instance_of::<PyTypeError>(py) {
            CallError::malformed(err.to_string())
        } else {
            match service_error_parts(err.value(py).as_any()) {
                Some((code, message)) => CallError::service(code, message),
                None => CallError::malformed(err.to_string()),
            }
        };
        self.remember(err);
        call_error
    }
}

/// Read `exc.response["Error"]["Code"/"Message"]` from a client error
fn service_error_parts(exc: &Bound<'_, PyAny>) -> Option<(String, String)> {
    let error = exc.getattr("response").ok()?.get_item("Error").ok()?;
    let code = error.get_item("Code").ok()?.extract::<String>().ok()?;
    let message = error
        .get_item("Message")
        .and_then(|m| m.extract::<String>())
        .unwrap_or_default();
    Some((code, message))
}

fn call_args<'py>(py: Python<'py>, call: &ServiceCall) -> PyResult<Bound<'py, PyDict>> {
    let kwargs = PyDict::new(py);
    for (name, value) in &call.kwargs {
        match value {
            ParamValue::Blob(bytes) => kwargs.set_item(name, PyBytes::new(py, bytes))?,
            ParamValue::Text(text) => kwargs.set_item(name, text)?,
        }
    }

    let args = PyDict::new(py);
    args.set_item("service", &call.service)?;
    args.set_item("command", &call.command)?;
    args.set_item("kwargs", kwargs)?;
    args.set_item("profile", call.profile.as_deref())?;
    args.set_item("region", call.region.as_deref())?;
    Ok(args)
}

fn to_response(result: &Bound<'_, PyAny>) -> PyResult<ServiceResponse> {
    let mut response = ServiceResponse::new();
    let Ok(fields) = result.downcast::<PyDict>() else {
        return Ok(response);
    };

    for (key, value) in fields.iter() {
        let key: String = key.extract()?;
        if let Ok(bytes) = value.downcast::<PyBytes>() {
            response.insert(key, ParamValue::Blob(bytes.as_bytes().to_vec()));
        } else if value.is_instance_of::<PyString>() {
            response.insert(key, ParamValue::Text(value.extract()?));
        } else if let Ok(bytes) = value.extract::<Vec<u8>>() {
            // bytearray, memoryview and other byte sequences
            response.insert(key, ParamValue::Blob(bytes));
        }
    }
    Ok(response)
}

impl ConnectionManager for PyConnectionManager {
    fn call(&self, call: ServiceCall) -> CallResult<ServiceResponse> {
        Python::with_gil(|py| {
            let args = call_args(py, &call).map_err(|e| self.call_error(py, e))?;
            let result = self
                .inner
                .bind(py)
                .call_method("call", (), Some(&args))
                .map_err(|e| self.call_error(py, e))?;
            to_response(&result).map_err(|e| self.call_error(py, e))
        })
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Forwards core diagnostics to Python's `logging.getLogger("kms_resolver")`
struct PyLogger;

impl PyLogger {
    fn emit(&self, method: &str, message: &str) {
        Python::with_gil(|py| {
            let logged = py
                .import("logging")
                .and_then(|logging| logging.call_method1("getLogger", ("kms_resolver",)))
                .and_then(|logger| logger.call_method1(method, (message,)));
            // A broken logging setup must not fail resolution
            if let Err(e) = logged {
                e.print(py);
            }
        });
    }
}

impl Logger for PyLogger {
    fn debug(&self, message: &str) {
        self.emit("debug", message);
    }

    fn info(&self, message: &str) {
        self.emit("info", message);
    }

    fn warn(&self, message: &str) {
        self.emit("warning", message);
    }

    fn error(&self, message: &str) {
        self.emit("error", message);
    }
}

// ============================================================================
// KmsResolver
// ============================================================================

/// Resolves a base64 KMS ciphertext to its plaintext
#[pyclass(name = "KmsResolver")]
pub struct KmsResolver {
    inner: CoreKmsResolver,
    connection_manager: Arc<PyConnectionManager>,
}

#[pymethods]
impl KmsResolver {
    #[new]
    #[pyo3(signature = (argument=None, stack=None))]
    pub fn new(argument: Option<String>, stack: Option<&Bound<'_, PyAny>>) -> PyResult<Self> {
        let stack = stack.ok_or_else(|| PyTypeError::new_err("KmsResolver requires a stack"))?;

        let name: String = stack.getattr("name")?.extract()?;
        let profile: Option<String> = stack.getattr("profile")?.extract()?;
        let region: Option<String> = stack.getattr("region")?.extract()?;
        let connection_manager = Arc::new(PyConnectionManager::new(
            stack.getattr("connection_manager")?.unbind(),
        ));

        let mut core_stack = Stack::new(name, connection_manager.clone());
        if let Some(profile) = profile {
            core_stack = core_stack.with_profile(profile);
        }
        if let Some(region) = region {
            core_stack = core_stack.with_region(region);
        }

        let logger: SharedLogger = Arc::new(PyLogger);
        let inner = CoreKmsResolver::new(argument, Arc::new(core_stack)).with_logger(logger);

        Ok(Self { inner, connection_manager })
    }

    #[getter]
    pub fn argument(&self) -> Option<String> {
        self.inner.argument().map(str::to_string)
    }

    /// Decrypt the argument; `None` when the argument is empty
    pub fn resolve(&self, py: Python<'_>) -> PyResult<Option<String>> {
        self.connection_manager.clear_raised();
        py.allow_threads(|| self.inner.resolve())
            .map_err(|e| self.to_py_err(e))
    }

    fn __repr__(&self) -> String {
        format!("KmsResolver(argument={:?})", self.inner.argument())
    }
}

impl KmsResolver {
    fn to_py_err(&self, err: ResolverError) -> PyErr {
        match err {
            ResolverError::ParameterNotFound(message) => ParameterNotFoundError::new_err(message),
            ResolverError::MissingField { field } => PyKeyError::new_err(field),
            ResolverError::Decoding(_) | ResolverError::InvalidUtf8(_) => PyValueError::new_err(err.to_string()),
            ResolverError::Call(call) => match self.connection_manager.take_raised() {
                Some(raised) => raised,
                None => match call {
                    CallError::Malformed(message) => PyTypeError::new_err(message),
                    CallError::Service(service) => PyRuntimeError::new_err(service.to_string()),
                },
            },
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}

// ============================================================================
// Module Functions
// ============================================================================

/// List registered resolvers as `(name, description)` tuples
#[pyfunction]
pub fn list_resolvers() -> Vec<(String, String)> {
    core_list_resolvers()
}

// ============================================================================
// Module Definition
// ============================================================================

#[pymodule]
fn kms_resolver(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<KmsResolver>()?;
    m.add("ParameterNotFoundError", m.py().get_type::<ParameterNotFoundError>())?;

    m.add_function(wrap_pyfunction!(list_resolvers, m)?)?;

    Ok(())
}
