//! # JNI 桥接层
//!
//! ## 设计思路
//!
//! 仅做参数适配（薄封装），对应 JVM 侧 `cpp.test.ImageLoader` 的 `external fun`：
//!
//! | JVM 方法 | 说明 |
//! |------|------|
//! | `nativeInit()` | 初始化日志与进程级加载器（默认配置） |
//! | `nativeInitWithConfig(json)` | 同上，配置来自 JSON |
//! | `nativeDecodeImageFromBytes(data, sampleSize, reqWidth, reqHeight)` | 内存字节解码 + 采样 |
//! | `nativeDecodeImage(path)` | 文件解码，经结果缓存 |
//!
//! ## 实现思路
//!
//! - 进程级 `ImageLoader` 存放在 `OnceCell` 中：初始化时写入一次，之后只读。
//!   未初始化就调用解码时使用默认配置惰性创建。
//! - 每个导出函数都经 `catch_boundary` 包裹：错误与 panic 只记录日志，返回 `null`；
//!   若 JNI 调用留下了挂起的 Java 异常，返回前清除。
//! - 导出函数只负责 JVM 对象与 Rust 值的转换（空引用转为 `None`），
//!   其余逻辑放在 `decode_bytes`/`decode_path`/`parse_config` 中，便于脱离 JVM 测试。
//! - Android 上日志写入 logcat（tag `ImageLoader`），其他平台使用 `env_logger`。

use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{JNI_FALSE, JNI_TRUE, jboolean, jbyteArray, jint};
use once_cell::sync::OnceCell;

use crate::error::BridgeError;
use crate::image_loader::{DecodeConfig, ImageLoader, ImageSource, SampleRequest};

static LOADER: OnceCell<ImageLoader> = OnceCell::new();

#[unsafe(no_mangle)]
pub extern "system" fn Java_cpp_test_ImageLoader_nativeInit(mut env: JNIEnv, _class: JClass) {
    init_logging();
    catch_boundary("nativeInit", || {
        shared_loader()?;
        Ok(())
    });
    clear_pending_exception(&mut env);
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_cpp_test_ImageLoader_nativeInitWithConfig(
    mut env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jboolean {
    init_logging();
    let initialized = catch_boundary("nativeInitWithConfig", || {
        let text = read_string(&mut env, &json)?;
        init_with_config(parse_config(text)?)
    });
    clear_pending_exception(&mut env);

    if initialized.is_some() { JNI_TRUE } else { JNI_FALSE }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_cpp_test_ImageLoader_nativeDecodeImageFromBytes(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
    sample_size: jint,
    req_width: jint,
    req_height: jint,
) -> jbyteArray {
    let result = catch_boundary("nativeDecodeImageFromBytes", || {
        let bytes = if data.is_null() {
            None
        } else {
            Some(env.convert_byte_array(&data)?)
        };
        let packed = decode_bytes(shared_loader()?, bytes, sample_size, req_width, req_height)?;
        Ok(env.byte_array_from_slice(&packed)?.into_raw())
    });
    clear_pending_exception(&mut env);

    result.unwrap_or(ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_cpp_test_ImageLoader_nativeDecodeImage(
    mut env: JNIEnv,
    _class: JClass,
    path: JString,
) -> jbyteArray {
    let result = catch_boundary("nativeDecodeImage", || {
        let path = read_string(&mut env, &path)?;
        let packed = decode_path(shared_loader()?, path)?;
        Ok(env.byte_array_from_slice(&packed)?.into_raw())
    });
    clear_pending_exception(&mut env);

    result.unwrap_or(ptr::null_mut())
}

#[cfg(target_os = "android")]
fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("ImageLoader"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// 读取 Java 字符串，空引用返回 `None`。
fn read_string(env: &mut JNIEnv, value: &JString) -> Result<Option<String>, BridgeError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(env.get_string(value)?.into()))
}

/// `nativeInitWithConfig` 的参数处理。
fn parse_config(json: Option<String>) -> Result<DecodeConfig, BridgeError> {
    let json = json.ok_or(BridgeError::NullArgument("json"))?;
    Ok(DecodeConfig::from_json(&json)?)
}

/// `nativeDecodeImageFromBytes` 的参数处理：按 JNI 入参选择采样方式并打包结果。
fn decode_bytes(
    loader: &ImageLoader,
    data: Option<Vec<u8>>,
    sample_size: i32,
    req_width: i32,
    req_height: i32,
) -> Result<Vec<u8>, BridgeError> {
    let data = data.ok_or(BridgeError::NullArgument("dataArray"))?;
    let request = SampleRequest::from_jni_args(sample_size, req_width, req_height);
    Ok(loader.load_packed(ImageSource::Bytes(data), request)?)
}

/// `nativeDecodeImage` 的参数处理：文件原尺寸解码。
fn decode_path(loader: &ImageLoader, path: Option<String>) -> Result<Vec<u8>, BridgeError> {
    let path = path.ok_or(BridgeError::NullArgument("path"))?;
    Ok(loader.load_packed(ImageSource::FilePath(path.into()), SampleRequest::PassThrough)?)
}

/// 获取进程级加载器，未初始化时按默认配置创建。
fn shared_loader() -> Result<&'static ImageLoader, BridgeError> {
    Ok(LOADER.get_or_try_init(|| ImageLoader::new(DecodeConfig::default()))?)
}

/// 以指定配置初始化进程级加载器，只允许成功一次。
fn init_with_config(config: DecodeConfig) -> Result<(), BridgeError> {
    let loader = ImageLoader::new(config)?;
    LOADER
        .set(loader)
        .map_err(|_| BridgeError::AlreadyInitialized)
}

/// 执行一次边界调用：错误与 panic 均记录日志并返回 `None`。
fn catch_boundary<T>(name: &str, body: impl FnOnce() -> Result<T, BridgeError>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            log::error!("{} 失败: {}", name, err);
            None
        }
        Err(_) => {
            log::error!("{} 发生 panic，已拦截", name);
            None
        }
    }
}

fn clear_pending_exception(env: &mut JNIEnv) {
    match env.exception_check() {
        Ok(true) => {
            if let Err(err) = env.exception_clear() {
                log::warn!("清除挂起的 Java 异常失败: {}", err);
            }
        }
        Ok(false) => {}
        Err(err) => log::warn!("检查挂起的 Java 异常失败: {}", err),
    }
}
