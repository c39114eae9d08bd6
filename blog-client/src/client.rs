/// Blogstone gRPC client implementation
use crate::error::{ClientError, Result};
use blog_proto::{self as proto, blog_service_client::BlogServiceClient};
use tonic::transport::Channel;
use tonic::Streaming;

/// A blog post as returned by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
}

impl From<proto::Blog> for BlogPost {
    fn from(blog: proto::Blog) -> Self {
        Self {
            id: blog.id,
            author_id: blog.author_id,
            title: blog.title,
            content: blog.content,
        }
    }
}

impl From<&BlogPost> for proto::Blog {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id.clone(),
            author_id: post.author_id.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
        }
    }
}

fn require_blog(blog: Option<proto::Blog>) -> Result<BlogPost> {
    blog.map(BlogPost::from)
        .ok_or_else(|| ClientError::MalformedResponse("response carried no blog".to_string()))
}

/// Blogstone remote client
#[derive(Clone)]
pub struct BlogClient {
    inner: BlogServiceClient<Channel>,
}

impl BlogClient {
    /// Connect to a blog server
    ///
    /// # Arguments
    /// * `addr` - Server address (e.g., "http://127.0.0.1:4040")
    ///
    /// # Example
    /// ```no_run
    /// # use blog_client::BlogClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = BlogClient::connect("http://localhost:4040").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let channel = Channel::from_shared(addr)
            .map_err(|e| ClientError::ConnectionError(format!("Invalid address: {}", e)))?
            .connect()
            .await
            .map_err(|e| ClientError::ConnectionError(format!("Failed to connect: {}", e)))?;

        Ok(Self::from_channel(channel))
    }

    /// Wrap an already established channel
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            inner: BlogServiceClient::new(channel),
        }
    }

    /// Create a blog post and return it with its assigned id
    ///
    /// # Example
    /// ```no_run
    /// # use blog_client::BlogClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut client = BlogClient::connect("http://localhost:4040").await?;
    /// let post = client.create_blog("alice", "Hello", "First post").await?;
    /// println!("created {}", post.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_blog(
        &mut self,
        author_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<BlogPost> {
        let request = proto::CreateBlogReq {
            blog: Some(proto::Blog {
                id: String::new(),
                author_id: author_id.into(),
                title: title.into(),
                content: content.into(),
            }),
        };

        let response = self.inner.create_blog(request).await?.into_inner();
        require_blog(response.blog)
    }

    /// Fetch a blog post by id
    pub async fn read_blog(&mut self, id: &str) -> Result<BlogPost> {
        let request = proto::ReadBlogReq { id: id.to_string() };
        let response = self.inner.read_blog(request).await?.into_inner();
        require_blog(response.blog)
    }

    /// Replace author, title and content of the post with `post.id`
    ///
    /// Returns the post as stored after the update.
    pub async fn update_blog(&mut self, post: &BlogPost) -> Result<BlogPost> {
        let request = proto::UpdateBlogReq {
            blog: Some(proto::Blog::from(post)),
        };
        let response = self.inner.update_blog(request).await?.into_inner();
        require_blog(response.blog)
    }

    /// Delete a blog post by id
    pub async fn delete_blog(&mut self, id: &str) -> Result<bool> {
        let request = proto::DeleteBlogReq { id: id.to_string() };
        let response = self.inner.delete_blog(request).await?.into_inner();
        Ok(response.success)
    }

    /// Open a stream over every blog post
    pub async fn list_blogs_stream(&mut self) -> Result<BlogStream> {
        let inner = self
            .inner
            .list_blogs(proto::ListBlogsReq {})
            .await?
            .into_inner();
        Ok(BlogStream { inner })
    }

    /// Collect every blog post
    ///
    /// Fails with the stream's error status if the server aborts the stream.
    pub async fn list_blogs(&mut self) -> Result<Vec<BlogPost>> {
        let mut stream = self.list_blogs_stream().await?;
        let mut posts = Vec::new();
        while let Some(post) = stream.next().await? {
            posts.push(post);
        }
        Ok(posts)
    }
}

/// Server-streamed sequence of blog posts
pub struct BlogStream {
    inner: Streaming<proto::ListBlogsRes>,
}

impl BlogStream {
    /// Next post, `None` when the server has finished the stream
    pub async fn next(&mut self) -> Result<Option<BlogPost>> {
        match self.inner.message().await? {
            Some(message) => require_blog(message.blog).map(Some),
            None => Ok(None),
        }
    }
}
