//! CoreGraphics window-list query for the frontmost application.

use core_foundation::{
    base::{CFRelease, CFTypeRef},
    dictionary::CFDictionaryRef,
    number::CFNumberRef,
    string::{CFString, CFStringRef},
};
use core_graphics::window as cgw;

/// Query the frontmost app name and owner PID using CGWindowList.
///
/// Walks on-screen windows front to back and takes the first layer-0 entry;
/// menu bar items and overlays live on other layers. Returns `None` when
/// the list is unavailable or carries no usable entry.
pub(crate) fn front_app_pid() -> Option<(String, i32)> {
    unsafe {
        unsafe fn get_string(dict: CFDictionaryRef, key: CFStringRef) -> Option<String> {
            let value = unsafe {
                core_foundation::dictionary::CFDictionaryGetValue(
                    dict,
                    key as *const core::ffi::c_void,
                )
            };
            if value.is_null() {
                return None;
            }
            // SAFETY: CFStringRef obtained from system APIs per get rule
            let cf = unsafe { CFString::wrap_under_get_rule(value as CFStringRef) };
            Some(cf.to_string())
        }
        unsafe fn get_number(dict: CFDictionaryRef, key: CFStringRef) -> Option<i32> {
            let value = unsafe {
                core_foundation::dictionary::CFDictionaryGetValue(
                    dict,
                    key as *const core::ffi::c_void,
                )
            };
            if value.is_null() {
                return None;
            }
            let mut out: i32 = 0;
            let ok = unsafe {
                core_foundation::number::CFNumberGetValue(
                    value as CFNumberRef,
                    9,
                    &mut out as *mut i32 as *mut core::ffi::c_void,
                )
            };
            if ok { Some(out) } else { None }
        }

        let options: cgw::CGWindowListOption =
            cgw::kCGWindowListOptionOnScreenOnly | cgw::kCGWindowListOptionOnScreenBelowWindow;
        let arr = cgw::CGWindowListCopyWindowInfo(options, cgw::kCGNullWindowID);
        if arr.is_null() {
            return None;
        }
        let count = core_foundation::array::CFArrayGetCount(arr);
        let mut hit: Option<(String, i32)> = None;
        for i in 0..count {
            let item = core_foundation::array::CFArrayGetValueAtIndex(arr, i);
            if item.is_null() {
                continue;
            }
            let dict = item as CFDictionaryRef;
            if let Some(layer) = get_number(dict, cgw::kCGWindowLayer)
                && layer != 0
            {
                continue;
            }
            if let Some(name) = get_string(dict, cgw::kCGWindowOwnerName)
                && let Some(pid) = get_number(dict, cgw::kCGWindowOwnerPID)
            {
                hit = Some((name, pid));
                break;
            }
        }
        CFRelease(arr as CFTypeRef);
        hit
    }
}
