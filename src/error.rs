use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误（页面缺失、查询为空等），不重试
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 外部服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 图片处理错误
    #[error("图片错误: {0}")]
    Image(#[from] ImageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 输入错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 页面图片不存在
    #[error("文件不存在: {path}")]
    PageNotFound { path: String },
    /// 读取页面图片失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 查询文本为空
    #[error("查询文本为空")]
    EmptyQuery,
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接失败、超时等）
    #[error("网络请求失败 ({endpoint}): {message}")]
    RequestFailed { endpoint: String, message: String },
    /// 请求超时
    #[error("请求超时 ({endpoint})")]
    Timeout { endpoint: String },
    /// 服务返回非成功状态码
    #[error("调用失败 ({endpoint})，状态码: {status}，响应: {body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 服务返回业务错误码
    #[error("服务返回错误 ({endpoint}): code={code:?}, message={message}")]
    BadResponse {
        endpoint: String,
        code: Option<i64>,
        message: String,
    },
    /// 响应格式错误
    #[error("响应格式错误 ({endpoint}): {message}")]
    MalformedBody { endpoint: String, message: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

/// 图片处理错误
#[derive(Debug, Error)]
pub enum ImageError {
    /// 图片解码失败
    #[error("图片解码失败: {0}")]
    DecodeFailed(String),
    /// 图片编码失败
    #[error("图片编码失败: {0}")]
    EncodeFailed(String),
    /// 裁剪图片写入失败
    #[error("裁剪图片保存失败 ({path}): {source}")]
    SaveFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("配置文件读取失败 ({path}): {message}")]
    FileReadFailed { path: String, message: String },
    /// TOML 解析失败
    #[error("TOML解析失败: {0}")]
    TomlParseFailed(#[from] toml::de::Error),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed(err))
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => AppError::Image(ImageError::EncodeFailed(e.to_string())),
            other => AppError::Image(ImageError::DecodeFailed(other.to_string())),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(format!("IO错误: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Other(format!("任务执行失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 将 reqwest 错误归类为超时或普通网络失败
    pub fn from_reqwest(endpoint: impl Into<String>, err: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if err.is_timeout() {
            AppError::Api(ApiError::Timeout { endpoint })
        } else {
            AppError::Api(ApiError::RequestFailed {
                endpoint,
                message: err.to_string(),
            })
        }
    }

    /// 创建响应格式错误
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Api(ApiError::MalformedBody {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    /// 是否是可以重试的传输层错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::RequestFailed { .. })
                | AppError::Api(ApiError::Timeout { .. })
                | AppError::Api(ApiError::BadStatus { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_message() {
        let err = AppError::from(InputError::EmptyQuery);
        assert!(err.to_string().contains("查询文本为空"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let timeout = AppError::Api(ApiError::Timeout {
            endpoint: "grading".to_string(),
        });
        assert!(timeout.is_transient());

        let malformed = AppError::malformed("grading", "not json");
        assert!(!malformed.is_transient());
    }
}
