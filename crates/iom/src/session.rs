//! Sessions: the root every mapped object hangs off.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use icinga2_api::{
    execute, ApiError, ApiRequest, ApiResponse, CacheDuration, CachedResultSet, Clock, Method,
    ResultSet, SystemClock, Transport,
};

use crate::objects::{MappedObject, ObjectSet};
use crate::types::{Form, TypeRegistry};

struct SessionInner {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    cache_duration: Cell<CacheDuration>,
    types: TypeRegistry,
}

/// Shared handle to a transport, a clock, a default cache duration and the
/// type registry. Cloning is cheap; clones share the registry.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cache_duration", &self.inner.cache_duration.get())
            .field("types", &self.inner.types)
            .finish()
    }
}

/// What [`Session::from_request`] turned a request into.
#[derive(Debug)]
pub enum Mapped {
    Objects(ObjectSet),
    Object(MappedObject),
    /// A query outside the objects endpoint.
    Results(CachedResultSet),
    /// Results of a request that was sent right away (anything but `GET`).
    Sent(ResultSet),
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, cache_duration: CacheDuration) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock), cache_duration)
    }

    pub fn with_clock(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        cache_duration: CacheDuration,
    ) -> Self {
        let types = TypeRegistry::new(Arc::clone(&transport), Arc::clone(&clock));
        Session {
            inner: Rc::new(SessionInner {
                transport,
                clock,
                cache_duration: Cell::new(cache_duration),
                types,
            }),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.inner.types
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub fn cache_duration(&self) -> CacheDuration {
        self.inner.cache_duration.get()
    }

    /// Applies to result sets created from now on.
    pub fn set_cache_duration(&self, duration: CacheDuration) {
        self.inner.cache_duration.set(duration);
    }

    /// A cached result set for `request` with the session's duration.
    pub fn cached(&self, request: ApiRequest) -> CachedResultSet {
        CachedResultSet::new(
            request,
            Arc::clone(&self.inner.transport),
            Arc::clone(&self.inner.clock),
            self.cache_duration(),
        )
    }

    /// Sends `request` once; non-success statuses become `RequestFailed`.
    pub fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        execute(self.inner.transport.as_ref(), request)
    }

    /// All objects of `type_name`, optionally narrowed by a filter expression.
    pub fn objects(&self, type_name: &str, filter: Option<&str>) -> Result<ObjectSet, ApiError> {
        let class = self.types().resolve_object(type_name, Form::Plural)?;
        let mut request = ApiRequest::get(format!("objects/{}", class.url_segment()));
        if let Some(f) = filter {
            request = request.with_filter(f);
        }
        Ok(ObjectSet::remote(self.clone(), class, self.cached(request)))
    }

    /// The object of `type_name` called `name`.
    pub fn object(&self, type_name: &str, name: &str) -> Result<MappedObject, ApiError> {
        if name.is_empty() {
            return Err(ApiError::InvalidArgument("object name is empty".into()));
        }
        let class = self.types().resolve_object(type_name, Form::Singular)?;
        let request = ApiRequest::get(format!("objects/{}/{}", class.url_segment(), name));
        Ok(MappedObject::remote(self.clone(), class, self.cached(request)))
    }

    /// Maps an arbitrary request: object queries become mapped objects,
    /// other queries cached result sets, and anything else is sent at once.
    pub fn from_request(&self, request: ApiRequest) -> Result<Mapped, ApiError> {
        if request.method != Method::Get {
            let response = self.send(&request)?;
            return Ok(Mapped::Sent(ResultSet::from_response(&response)?));
        }

        let segments: Vec<String> = request.path_segments().iter().map(|s| s.to_string()).collect();
        match segments.as_slice() {
            [root, type_name] if root == "objects" => {
                let class = self.types().resolve_object(type_name, Form::Plural)?;
                Ok(Mapped::Objects(ObjectSet::remote(
                    self.clone(),
                    class,
                    self.cached(request),
                )))
            }
            [root, type_name, _name] if root == "objects" => {
                let class = self.types().resolve_object(type_name, Form::Singular)?;
                Ok(Mapped::Object(MappedObject::remote(
                    self.clone(),
                    class,
                    self.cached(request),
                )))
            }
            _ => Ok(Mapped::Results(self.cached(request))),
        }
    }

    /// The `status` endpoint.
    pub fn status(&self) -> CachedResultSet {
        self.cached(ApiRequest::get("status"))
    }
}
