use json_patch::diff;
use kube::{
    Api, Resource, ResourceExt,
    api::{Patch, PatchParams},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    MANAGER,
    errors::{ControllerError, ExtKubeApiError},
};

/// Adds `finalizer` to the object and persists the change, unless it is
/// already present. Finalizers owned by others are left untouched.
pub(crate) async fn add_finalizer_if_missing<T>(
    api: &Api<T>,
    object: &mut T,
    finalizer: &str,
) -> Result<bool, ControllerError>
where
    T: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Resource,
{
    object.meta_mut().managed_fields = Default::default();
    let finalizers = object.finalizers_mut();
    if finalizers.iter().find(|f| f.as_str() == finalizer).is_none() {
        finalizers.push(finalizer.to_string());
        api.patch(
            object.name_any().as_str(),
            &PatchParams::apply(MANAGER).force(),
            &Patch::Apply(&*object),
        )
        .await?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Removes `finalizer` from the object and persists the change, if present.
///
/// Uses a JSON Patch instead of server-side apply: apply cannot reliably
/// remove array elements owned by another field manager, which is exactly
/// the situation for the shared `metadata.finalizers` list.
pub(crate) async fn remove_finalizer<T>(
    api: &Api<T>,
    object: &mut T,
    finalizer: &str,
) -> Result<bool, ControllerError>
where
    T: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Resource,
{
    let original = object.clone();
    let finalizers = object.finalizers_mut();
    let len = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    if finalizers.len() != len {
        let patch = diff(
            &serde_json::to_value(&original)?,
            &serde_json::to_value(&*object)?,
        );
        match api
            .patch(
                object.name_any().as_str(),
                &PatchParams::apply(MANAGER),
                &Patch::<T>::Json(patch),
            )
            .await
        {
            Ok(_) => (),
            // The object disappearing underneath us is exactly what the
            // finalizer removal is meant to allow.
            Err(e) if e.is_not_found() => (),
            Err(e) => Err(e)?,
        }
        Ok(true)
    } else {
        Ok(false)
    }
}
